//! Command implementations

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::debug;
use vireo_core::runtime::state_from_json;
use vireo_core::{ComponentOptions, Diagnostic, RecordingSink, RuntimeConfig, Severity, StateMap};
use vireo_web::web_runtime;

const DEFAULT_CONFIG: &str = "vireo.toml";

/// Load `path`, or `./vireo.toml` when present, or the defaults
pub fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG);
            if !default.exists() {
                return Ok(RuntimeConfig::default());
            }
            default
        }
    };
    debug!("loading configuration from {}", path.display());
    RuntimeConfig::load(&path).with_context(|| format!("failed to load {}", path.display()))
}

/// Output of one render
#[derive(Debug)]
pub struct Rendered {
    pub html: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Rendered {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }
}

/// `NAME=FILE`
pub fn parse_component_arg(arg: &str) -> Result<(String, PathBuf)> {
    match arg.split_once('=') {
        Some((name, file)) if !name.trim().is_empty() && !file.trim().is_empty() => {
            Ok((name.trim().to_string(), PathBuf::from(file.trim())))
        }
        _ => bail!("expected NAME=FILE, got `{}`", arg),
    }
}

/// Render `template` with `data` as the root state
///
/// `components` are (name, template source) pairs registered globally first.
pub fn render_source(
    config: RuntimeConfig,
    template: &str,
    data: StateMap,
    components: &[(String, String)],
) -> Result<Rendered> {
    let sink = RecordingSink::new();
    let mut runtime = web_runtime(config).diagnostics(sink.clone()).build()?;

    for (name, source) in components {
        runtime.component(name, ComponentOptions::new().template(source.as_str()));
    }

    let id = runtime.create(
        runtime.root(),
        ComponentOptions::new()
            .template(template)
            .data(move |_| Ok(data.clone())),
    )?;
    runtime.mount(id, None);
    runtime.flush();

    let html = runtime
        .instance(id)
        .and_then(|instance| instance.el())
        .map(|el| runtime.host().outer_html(el));

    Ok(Rendered {
        html,
        diagnostics: sink.records(),
    })
}

pub fn render(config: RuntimeConfig, template: &Path, data: Option<&Path>, components: &[String]) -> Result<()> {
    let source = read(template)?;
    let data = match data {
        Some(path) => {
            let text = read(path)?;
            let value: Value = serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))?;
            if !value.is_object() {
                bail!("{} must contain a JSON object", path.display());
            }
            state_from_json(value)
        }
        None => StateMap::new(),
    };

    let mut registered = Vec::with_capacity(components.len());
    for arg in components {
        let (name, file) = parse_component_arg(arg)?;
        registered.push((name, read(&file)?));
    }

    let rendered = render_source(config, &source, data, &registered)?;
    for diagnostic in &rendered.diagnostics {
        eprintln!("{:?}: {}", diagnostic.severity, diagnostic);
    }
    match rendered.html {
        Some(html) => {
            println!("{}", html);
            Ok(())
        }
        None => bail!("{} could not be rendered", template.display()),
    }
}

pub fn check(config: RuntimeConfig, files: &[PathBuf]) -> Result<()> {
    let runtime = web_runtime(config).diagnostics(RecordingSink::new()).build()?;
    let mut failed = 0;
    for file in files {
        let source = read(file)?;
        match runtime.compile(&source) {
            Ok(_) => println!("{}: ok", file.display()),
            Err(err) => {
                failed += 1;
                eprintln!("{}: {}", file.display(), err);
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} templates failed to compile", failed, files.len());
    }
    Ok(())
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

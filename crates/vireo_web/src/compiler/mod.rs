//! Template compiler
//!
//! [`WebCompiler`] implements [`TemplateCompiler`]: templates are parsed
//! ([`parser`]), expressions compiled ([`expr`]) and the tree lowered into
//! render closures ([`codegen`]). Results are cached per
//! (template, delimiters, newline decoding) in an LRU cache.

pub mod expr;
pub mod parser;

mod codegen;

use std::cell::RefCell;
use std::num::NonZeroUsize;

use lru::LruCache;
use tracing::{debug, trace};
use vireo_core::{CompileError, CompileOptions, CompiledTemplate, TemplateCompiler};

use self::codegen::Codegen;
use self::parser::ParseOptions;

pub use self::codegen::is_component_tag;

/// Default interpolation delimiters
pub const DEFAULT_DELIMITERS: (&str, &str) = ("{{", "}}");

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    template: String,
    delimiters: Option<(String, String)>,
    decode_newlines: bool,
}

/// Caching template compiler
pub struct WebCompiler {
    cache: RefCell<LruCache<CacheKey, CompiledTemplate>>,
}

impl WebCompiler {
    /// Create a compiler caching up to `capacity` compiled templates
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RefCell::new(LruCache::new(capacity)),
        }
    }

    /// Number of cached compilations
    pub fn cached(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }
}

impl Default for WebCompiler {
    fn default() -> Self {
        Self::new(128)
    }
}

impl TemplateCompiler for WebCompiler {
    fn compile(&self, template: &str, options: &CompileOptions<'_>) -> Result<CompiledTemplate, CompileError> {
        let key = CacheKey {
            template: template.to_string(),
            delimiters: options.delimiters.cloned(),
            decode_newlines: options.decode_newlines,
        };
        if let Some(hit) = self.cache.borrow_mut().get(&key) {
            trace!("WebCompiler::compile: cache hit");
            return Ok(hit.clone());
        }

        let compiled = compile_template(template, options)?;
        self.cache.borrow_mut().put(key, compiled.clone());
        debug!(
            "WebCompiler::compile: compiled template ({} static trees)",
            compiled.static_render_fns.len()
        );
        Ok(compiled)
    }
}

/// Compile without caching
pub fn compile_template(template: &str, options: &CompileOptions<'_>) -> Result<CompiledTemplate, CompileError> {
    let (open, close) = match options.delimiters {
        Some((open, close)) => (open.as_str(), close.as_str()),
        None => DEFAULT_DELIMITERS,
    };
    if open.is_empty() || close.is_empty() {
        return Err(CompileError::new("interpolation delimiters must not be empty"));
    }

    let nodes = parser::parse(
        template.trim(),
        ParseOptions {
            decode_newlines: options.decode_newlines,
            comments: false,
        },
    )
    .map_err(|errors| CompileError { errors })?;

    Codegen::new(open, close, options.warn)
        .generate(nodes)
        .map_err(|errors| CompileError { errors })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options<'a>(warn: &'a dyn Fn(&str), delimiters: Option<&'a (String, String)>) -> CompileOptions<'a> {
        CompileOptions {
            warn,
            decode_newlines: false,
            delimiters,
        }
    }

    #[test]
    fn test_cache_keyed_by_delimiters() {
        let compiler = WebCompiler::new(8);
        let warn = |_: &str| {};
        let custom = ("${".to_string(), "}".to_string());

        compiler.compile("<p>{{ a }}</p>", &options(&warn, None)).unwrap();
        compiler.compile("<p>{{ a }}</p>", &options(&warn, None)).unwrap();
        assert_eq!(compiler.cached(), 1);

        compiler.compile("<p>{{ a }}</p>", &options(&warn, Some(&custom))).unwrap();
        assert_eq!(compiler.cached(), 2);

        compiler.clear_cache();
        assert_eq!(compiler.cached(), 0);
    }

    #[test]
    fn test_cache_is_bounded() {
        let compiler = WebCompiler::new(2);
        let warn = |_: &str| {};
        for n in 0..5 {
            compiler.compile(&format!("<p>{}</p>", n), &options(&warn, None)).unwrap();
        }
        assert_eq!(compiler.cached(), 2);
    }

    #[test]
    fn test_errors_not_cached() {
        let compiler = WebCompiler::new(4);
        let warn = |_: &str| {};
        let err = compiler.compile("<div><p></div>", &options(&warn, None)).unwrap_err();
        assert!(!err.errors.is_empty());
        assert_eq!(compiler.cached(), 0);
    }

    #[test]
    fn test_warnings_forwarded() {
        let warnings = RefCell::new(Vec::new());
        let warn = |message: &str| warnings.borrow_mut().push(message.to_string());
        compile_template("<div @click=\"go\"></div>", &options(&warn, None)).unwrap();
        assert_eq!(warnings.borrow().len(), 1);
        assert!(warnings.borrow()[0].contains("@click"));
    }

    #[test]
    fn test_empty_delimiters_rejected() {
        let warn = |_: &str| {};
        let empty = (String::new(), "}".to_string());
        assert!(compile_template("<p></p>", &options(&warn, Some(&empty))).is_err());
    }
}

//! Lowering parsed templates into render functions
//!
//! The parsed tree is lowered into a small instruction tree ([`Ir`]). Fully
//! static element subtrees are hoisted out and rendered once per instance
//! through the static render functions.

use std::rc::Rc;

use serde_json::Value;
use vireo_core::{
    display_value, CompiledTemplate, Diagnostic, DiagnosticKind, Listener, RenderFn, RenderScope,
    StateMap, VComponent, VElement, VNode, Vm,
};

use super::expr::{self, truthy, Expr};
use super::parser::{Element, Node};

#[derive(Clone, Debug)]
pub(crate) enum Ir {
    /// Hoisted static subtree
    Static(usize),
    Element(ElementIr),
    Component(ComponentIr),
    Text(Vec<TextPart>),
    /// Default slot with its fallback content
    Slot(Vec<Ir>),
    /// `v-if`: renders an empty placeholder when falsy
    If(Expr, Box<Ir>),
}

#[derive(Clone, Debug)]
pub(crate) struct ElementIr {
    tag: String,
    attrs: Vec<(String, AttrValue)>,
    directives: Vec<(String, Option<Expr>)>,
    children: Vec<Ir>,
}

#[derive(Clone, Debug)]
pub(crate) struct ComponentIr {
    tag: String,
    props: Vec<(String, AttrValue)>,
    /// (event, parent method)
    listeners: Vec<(String, String)>,
    children: Vec<Ir>,
}

#[derive(Clone, Debug)]
pub(crate) enum AttrValue {
    Static(String),
    Bound(Expr),
}

#[derive(Clone, Debug)]
pub(crate) enum TextPart {
    Literal(String),
    Interpolation(Expr),
}

/// Lowers one template
pub(crate) struct Codegen<'a> {
    open: &'a str,
    close: &'a str,
    warn: &'a dyn Fn(&str),
    errors: Vec<String>,
    statics: Vec<Ir>,
}

impl<'a> Codegen<'a> {
    pub fn new(open: &'a str, close: &'a str, warn: &'a dyn Fn(&str)) -> Self {
        Self {
            open,
            close,
            warn,
            errors: Vec::new(),
            statics: Vec::new(),
        }
    }

    /// Lower the top-level nodes of a template; exactly one root element
    pub fn generate(mut self, nodes: Vec<Node>) -> Result<CompiledTemplate, Vec<String>> {
        let mut roots = Vec::new();
        let mut has_text = false;
        for node in nodes {
            match node {
                Node::Element(element) => roots.push(element),
                Node::Text(text) if !text.trim().is_empty() => has_text = true,
                _ => {}
            }
        }

        let root = match roots.len() {
            0 if has_text => {
                return Err(vec!["component template requires a root element, rather than just text".to_string()]);
            }
            0 => return Err(vec!["template is empty".to_string()]),
            1 => roots.remove(0),
            _ => {
                return Err(vec![
                    "component template should contain exactly one root element".to_string(),
                ]);
            }
        };
        if has_text {
            (self.warn)("text outside the root element will be ignored");
        }
        if root.tag == "slot" {
            return Err(vec!["cannot use <slot> as component root element".to_string()]);
        }

        let root = self.lower_element(root);
        if !self.errors.is_empty() {
            return Err(self.errors);
        }
        let root = self.hoist(root);

        let root = Rc::new(root);
        let render: RenderFn = Rc::new(move |scope: &mut RenderScope<'_>| Ok::<_, anyhow::Error>(render_root(&root, scope)));
        let static_render_fns = self
            .statics
            .into_iter()
            .map(|ir| {
                let ir = Rc::new(ir);
                Rc::new(move |scope: &mut RenderScope<'_>| Ok::<_, anyhow::Error>(render_root(&ir, scope))) as RenderFn
            })
            .collect();

        Ok(CompiledTemplate {
            render,
            static_render_fns,
        })
    }

    fn lower_nodes(&mut self, nodes: Vec<Node>) -> Vec<Ir> {
        nodes
            .into_iter()
            .filter_map(|node| match node {
                Node::Element(element) => Some(self.lower_element(element)),
                Node::Text(text) => Some(Ir::Text(self.lower_text(&text))),
                Node::Comment(_) => None,
            })
            .collect()
    }

    fn lower_element(&mut self, element: Element) -> Ir {
        let Element { tag, attrs, children } = element;

        if tag == "slot" {
            return Ir::Slot(self.lower_nodes(children));
        }

        let component = is_component_tag(&tag);
        let mut condition = None;
        let mut static_attrs = Vec::new();
        let mut directives = Vec::new();
        let mut listeners = Vec::new();

        for (name, value) in attrs {
            if name == "v-if" {
                condition = self.expression(&value, &name);
            } else if matches!(name.as_str(), "v-else" | "v-else-if" | "v-for" | "v-model" | "v-slot") {
                self.errors.push(format!("unsupported directive {} on <{}>", name, tag));
            } else if let Some(event) = name.strip_prefix('@').or_else(|| name.strip_prefix("v-on:")) {
                if !component {
                    (self.warn)(&format!("native listener @{} on <{}> is ignored", event, tag));
                    continue;
                }
                let handler = value.trim();
                let is_method_name = !handler.is_empty()
                    && handler.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$')
                    && !handler.starts_with(|c: char| c.is_ascii_digit());
                if is_method_name {
                    listeners.push((event.to_string(), handler.to_string()));
                } else {
                    self.errors.push(format!("event handler for @{} must be a method name, got \"{}\"", event, handler));
                }
            } else if let Some(bound) = name.strip_prefix(':').or_else(|| name.strip_prefix("v-bind:")) {
                if let Some(expr) = self.expression(&value, &name) {
                    static_attrs.push((bound.to_string(), AttrValue::Bound(expr)));
                }
            } else if let Some(directive) = name.strip_prefix("v-") {
                let directive = directive.split(':').next().unwrap_or(directive).to_string();
                let value = if value.trim().is_empty() {
                    None
                } else {
                    self.expression(&value, &name)
                };
                directives.push((directive, value));
            } else {
                static_attrs.push((name, AttrValue::Static(value)));
            }
        }

        let children = self.lower_nodes(children);
        let node = if component {
            if !directives.is_empty() {
                (self.warn)(&format!("directives on component <{}> are ignored", tag));
            }
            Ir::Component(ComponentIr {
                tag,
                props: static_attrs,
                listeners,
                children,
            })
        } else {
            Ir::Element(ElementIr {
                tag,
                attrs: static_attrs,
                directives,
                children,
            })
        };

        match condition {
            Some(condition) => Ir::If(condition, Box::new(node)),
            None => node,
        }
    }

    fn expression(&mut self, source: &str, context: &str) -> Option<Expr> {
        match expr::parse(source) {
            Ok(expr) => Some(expr),
            Err(err) => {
                self.errors.push(format!("invalid expression in {}: {}", context, err));
                None
            }
        }
    }

    /// Split text on interpolation delimiters
    fn lower_text(&mut self, text: &str) -> Vec<TextPart> {
        let mut parts = Vec::new();
        let mut rest = text;
        while let Some(start) = rest.find(self.open) {
            let after = &rest[start + self.open.len()..];
            let Some(end) = after.find(self.close) else {
                break;
            };
            if start > 0 {
                parts.push(TextPart::Literal(rest[..start].to_string()));
            }
            let source = &after[..end];
            let context = format!("{}{}{}", self.open, source, self.close);
            if let Some(expr) = self.expression(source, &context) {
                parts.push(TextPart::Interpolation(expr));
            }
            rest = &after[end + self.close.len()..];
        }
        if !rest.is_empty() {
            parts.push(TextPart::Literal(rest.to_string()));
        }
        parts
    }

    /// Move static roots into the static render functions
    fn hoist(&mut self, ir: Ir) -> Ir {
        if is_static_root(&ir) {
            self.statics.push(ir);
            return Ir::Static(self.statics.len() - 1);
        }
        match ir {
            Ir::Element(mut el) => {
                el.children = el.children.into_iter().map(|child| self.hoist(child)).collect();
                Ir::Element(el)
            }
            Ir::Component(mut component) => {
                component.children = component.children.into_iter().map(|child| self.hoist(child)).collect();
                Ir::Component(component)
            }
            Ir::Slot(fallback) => Ir::Slot(fallback.into_iter().map(|child| self.hoist(child)).collect()),
            Ir::If(condition, inner) => Ir::If(condition, Box::new(self.hoist(*inner))),
            other => other,
        }
    }
}

/// PascalCase or hyphenated tags name components
pub fn is_component_tag(tag: &str) -> bool {
    tag.contains('-') || tag.starts_with(|c: char| c.is_ascii_uppercase())
}

fn is_static(ir: &Ir) -> bool {
    match ir {
        Ir::Static(_) => true,
        Ir::Text(parts) => parts.iter().all(|part| matches!(part, TextPart::Literal(_))),
        Ir::Element(el) => {
            el.directives.is_empty()
                && el.attrs.iter().all(|(_, value)| matches!(value, AttrValue::Static(_)))
                && el.children.iter().all(is_static)
        }
        Ir::Component(_) | Ir::Slot(_) | Ir::If(..) => false,
    }
}

/// A static element worth hoisting: more than a lone text child
fn is_static_root(ir: &Ir) -> bool {
    match ir {
        Ir::Element(el) => {
            is_static(ir) && !el.children.is_empty() && !(el.children.len() == 1 && matches!(el.children[0], Ir::Text(_)))
        }
        _ => false,
    }
}

// =============================================================================
// Rendering
// =============================================================================

fn render_root(ir: &Ir, scope: &mut RenderScope<'_>) -> VNode {
    let mut out = Vec::with_capacity(1);
    render(ir, scope, &mut out);
    out.into_iter().next().unwrap_or_else(VNode::empty)
}

fn render(ir: &Ir, scope: &mut RenderScope<'_>, out: &mut Vec<VNode>) {
    match ir {
        Ir::Static(index) => out.push(scope.static_tree(*index)),
        Ir::Text(parts) => {
            let mut text = String::new();
            for part in parts {
                match part {
                    TextPart::Literal(literal) => text.push_str(literal),
                    TextPart::Interpolation(expr) => text.push_str(&display_value(&expr.eval(scope))),
                }
            }
            out.push(VNode::Text(text));
        }
        Ir::If(condition, inner) => {
            if truthy(&condition.eval(scope)) {
                render(inner, scope, out);
            } else {
                out.push(VNode::empty());
            }
        }
        Ir::Element(el) => out.push(render_element(el, scope)),
        Ir::Component(component) => out.push(render_component(component, scope)),
        Ir::Slot(fallback) => {
            let provided = scope.render_children();
            if provided.is_empty() {
                for child in fallback {
                    render(child, scope, out);
                }
            } else {
                out.extend(provided);
            }
        }
    }
}

fn render_children(children: &[Ir], scope: &mut RenderScope<'_>) -> Vec<VNode> {
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        render(child, scope, &mut out);
    }
    out
}

/// `null` and `false` bindings drop the attribute
fn attr_string(value: &AttrValue, scope: &mut RenderScope<'_>) -> Option<String> {
    match value {
        AttrValue::Static(value) => Some(value.clone()),
        AttrValue::Bound(expr) => match expr.eval(scope) {
            Value::Null | Value::Bool(false) => None,
            value => Some(display_value(&value)),
        },
    }
}

fn render_element(el: &ElementIr, scope: &mut RenderScope<'_>) -> VNode {
    let mut element = VElement {
        tag: el.tag.clone(),
        ..Default::default()
    };
    for (name, value) in &el.attrs {
        if let Some(value) = attr_string(value, scope) {
            element.attrs.insert(name.clone(), value);
        }
    }
    element.children = render_children(&el.children, scope);
    for (name, value) in &el.directives {
        let value = value.as_ref().map(|expr| expr.eval(scope)).unwrap_or(Value::Null);
        scope.directive(name, &mut element, &value);
    }
    VNode::Element(element)
}

fn render_component(component: &ComponentIr, scope: &mut RenderScope<'_>) -> VNode {
    let Some(ctor) = scope.component(&component.tag) else {
        scope.report(Diagnostic::new(
            DiagnosticKind::UnknownElement,
            format!("unknown custom element: <{}>; did you register the component?", component.tag),
        ));
        let mut element = VElement {
            tag: component.tag.clone(),
            ..Default::default()
        };
        for (name, value) in &component.props {
            if let Some(value) = attr_string(value, scope) {
                element.attrs.insert(name.clone(), value);
            }
        }
        element.children = render_children(&component.children, scope);
        return VNode::Element(element);
    };

    let mut props = StateMap::new();
    for (name, value) in &component.props {
        let value = match value {
            AttrValue::Static(value) => Value::String(value.clone()),
            AttrValue::Bound(expr) => expr.eval(scope),
        };
        props.insert(camelize(name), value);
    }

    let parent = scope.id();
    let mut vnode = VComponent {
        tag: component.tag.clone(),
        ctor,
        props,
        listeners: Default::default(),
        children: render_children(&component.children, scope),
    };
    for (event, method) in &component.listeners {
        let method = method.clone();
        let listener: Listener = Rc::new(move |vm: &mut Vm<'_>, args: &[Value]| {
            vm.with(parent).call(&method, args).map(|_| ())
        });
        vnode.listeners.insert(event.clone(), listener);
    }
    VNode::Component(vnode)
}

/// `todo-item` → `todoItem`
fn camelize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::parser::{parse, ParseOptions};

    fn lower(template: &str) -> Result<CompiledTemplate, Vec<String>> {
        let nodes = parse(template, ParseOptions::default()).unwrap();
        Codegen::new("{{", "}}", &|_: &str| {}).generate(nodes)
    }

    #[test]
    fn test_component_tags() {
        assert!(is_component_tag("todo-item"));
        assert!(is_component_tag("TodoItem"));
        assert!(!is_component_tag("div"));
    }

    #[test]
    fn test_camelize() {
        assert_eq!(camelize("item-count"), "itemCount");
        assert_eq!(camelize("label"), "label");
    }

    #[test]
    fn test_static_subtrees_hoisted() {
        let compiled = lower("<div><p>{{ a }}</p><ul><li>one</li><li>two</li></ul></div>").unwrap();
        assert_eq!(compiled.static_render_fns.len(), 1);

        let compiled = lower("<div><p>{{ a }}</p><span>plain</span></div>").unwrap();
        assert!(compiled.static_render_fns.is_empty());
    }

    #[test]
    fn test_fully_static_root_is_hoisted() {
        let compiled = lower("<div><b>x</b></div>").unwrap();
        assert_eq!(compiled.static_render_fns.len(), 1);
    }

    #[test]
    fn test_root_errors() {
        let errors = lower("<p>a</p><p>b</p>").unwrap_err();
        assert_eq!(errors, vec!["component template should contain exactly one root element".to_string()]);

        assert!(lower("just text").is_err());
        assert!(lower("<slot></slot>").is_err());
    }

    #[test]
    fn test_expression_errors_collected() {
        let errors = lower("<div :title=\"a +\">{{ b c }}</div>").unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("invalid expression in :title"));
        assert!(errors[1].starts_with("invalid expression in {{ b c }}"));
    }

    #[test]
    fn test_handler_must_be_method_name() {
        let errors = lower("<div><my-button @click=\"n = n + 1\"></my-button></div>").unwrap_err();
        assert!(errors[0].contains("must be a method name"));
    }
}

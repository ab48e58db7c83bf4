//! Component markup and its static rendering
//!
//! Component templates return anything implementing [`maud::Render`]: usually
//! a [`maud::Markup`] built with `html!`, or a [`Node`] tree built at runtime.
//! Either is rendered once per request with [`render_to_static_markup`]; no
//! hydration attributes or comments are emitted, so the output matches a
//! hand-written HTML template of the same document. All text and attribute
//! values are escaped by maud.

use maud::{PreEscaped, Render};

/// Elements that never have children or a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// A node in a component tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Escaped text content
    Text(String),
    /// Markup inserted verbatim (e.g. an inline `<style>` body)
    Raw(String),
    /// Children without a wrapping element
    Fragment(Vec<Node>),
}

/// An HTML element with ordered attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    /// Add an attribute. Attributes render in insertion order.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn children<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children.extend(nodes.into_iter().map(Into::into));
        self
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::Text(s.to_string())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::Text(s)
    }
}

pub fn el(tag: impl Into<String>) -> Element {
    Element {
        tag: tag.into(),
        attrs: Vec::new(),
        children: Vec::new(),
    }
}

pub fn text(content: impl Into<String>) -> Node {
    Node::Text(content.into())
}

pub fn raw(markup: impl Into<String>) -> Node {
    Node::Raw(markup.into())
}

pub fn fragment<I, N>(nodes: I) -> Node
where
    I: IntoIterator<Item = N>,
    N: Into<Node>,
{
    Node::Fragment(nodes.into_iter().map(Into::into).collect())
}

impl Render for Node {
    fn render_to(&self, out: &mut String) {
        match self {
            Node::Text(t) => t.render_to(out),
            Node::Raw(r) => PreEscaped(r.as_str()).render_to(out),
            Node::Fragment(children) => {
                for child in children {
                    child.render_to(out);
                }
            }
            Node::Element(element) => element.render_to(out),
        }
    }
}

impl Render for Element {
    fn render_to(&self, out: &mut String) {
        let tag = self.tag.to_ascii_lowercase();
        out.push('<');
        out.push_str(&tag);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            value.render_to(out);
            out.push('"');
        }
        out.push('>');

        if VOID_ELEMENTS.contains(&tag.as_str()) {
            return;
        }

        for child in &self.children {
            child.render_to(out);
        }
        out.push_str("</");
        out.push_str(&tag);
        out.push('>');
    }
}

/// Render a component to an HTML string
pub fn render_to_static_markup(component: &impl Render) -> String {
    component.render().into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use maud::html;

    #[test]
    fn test_render_nested() {
        let tree = el("div")
            .attr("class", "container")
            .child(el("h1").child("Hello"))
            .child(el("p").children(["a", "b"]));
        assert_eq!(
            render_to_static_markup(&tree),
            r#"<div class="container"><h1>Hello</h1><p>ab</p></div>"#
        );
    }

    #[test]
    fn test_text_and_attributes_escaped() {
        let tree = el("a")
            .attr("title", "say \"hi\" & <bye>")
            .child("<script>alert(1)</script>");
        assert_eq!(
            render_to_static_markup(&tree),
            "<a title=\"say &quot;hi&quot; &amp; &lt;bye&gt;\">&lt;script&gt;alert(1)&lt;/script&gt;</a>"
        );
    }

    #[test]
    fn test_void_elements() {
        let tree = el("head")
            .child(el("meta").attr("charset", "utf-8"))
            .child(el("br").child("ignored"));
        assert_eq!(
            render_to_static_markup(&tree),
            r#"<head><meta charset="utf-8"><br></head>"#
        );
    }

    #[test]
    fn test_raw_and_fragment() {
        let tree = fragment([
            Node::from(el("style").child(raw(".a > .b { color: red; }"))),
            text("x"),
        ]);
        assert_eq!(
            render_to_static_markup(&tree),
            "<style>.a > .b { color: red; }</style>x"
        );
    }

    #[test]
    fn test_node_matches_html_macro() {
        let title = "Fish & Chips";
        let tree = el("div").attr("class", "card").child(el("h1").child(title));
        let markup = html! { div class="card" { h1 { (title) } } };
        assert_eq!(render_to_static_markup(&tree), markup.into_string());
    }

    #[test]
    fn test_node_embeds_in_html_macro() {
        let badge = Node::from(el("span").child("v2"));
        let markup = html! { p { "Release " (badge) } };
        assert_eq!(
            render_to_static_markup(&markup),
            "<p>Release <span>v2</span></p>"
        );
    }
}

//! Deterministic text generation from the document tree.
//!
//! Generation is the inverse of parsing up to whitespace: parsing the
//! generated text and generating again is a fixed point. Attribute order
//! follows the tree's insertion order; children serialize in their stable
//! structural order.

use scena_core::document::{AttrValue, Child, Document, Node, format_number};

const INDENT: &str = "  ";

/// Render a document back to composition source text.
pub fn generate(doc: &Document) -> String {
    let mut out = String::new();
    write_node(&mut out, doc.root(), 0);
    out.push('\n');
    out
}

fn write_node(out: &mut String, node: &Node, depth: usize) {
    let pad = INDENT.repeat(depth);
    out.push_str(&pad);
    out.push('<');
    out.push_str(&node.tag().to_string());
    for (name, value) in node.attributes() {
        write_attribute(out, &name.to_string(), value);
    }

    if node.children().is_empty() {
        if node.attributes().is_empty() {
            out.push_str("/>");
        } else {
            out.push_str(" />");
        }
        return;
    }

    out.push('>');
    for child in node.children() {
        out.push('\n');
        match child {
            Child::Element(element) => write_node(out, element, depth + 1),
            Child::Text(text) => {
                out.push_str(&INDENT.repeat(depth + 1));
                out.push_str(text.trim());
            }
            Child::Expression(expr) => {
                out.push_str(&INDENT.repeat(depth + 1));
                out.push('{');
                out.push_str(expr.text());
                out.push('}');
            }
            Child::Declaration { name, value } => {
                out.push_str(&INDENT.repeat(depth + 1));
                out.push_str(&format!("{{let {} = {}}}", name, value.text()));
            }
        }
    }
    out.push('\n');
    out.push_str(&pad);
    out.push_str("</");
    out.push_str(&node.tag().to_string());
    out.push('>');
}

fn write_attribute(out: &mut String, name: &str, value: &AttrValue) {
    match value {
        // Boolean true regenerates as a valueless flag attribute.
        AttrValue::Bool(true) => {
            out.push(' ');
            out.push_str(name);
        }
        AttrValue::Bool(false) => {
            out.push_str(&format!(" {name}={{false}}"));
        }
        AttrValue::Str(text) => {
            out.push_str(&format!(" {name}=\"{}\"", escape_string(text)));
        }
        AttrValue::Number(number) => {
            out.push_str(&format!(" {name}={{{}}}", format_number(*number)));
        }
        AttrValue::Object(map) => {
            out.push_str(&format!(" {name}={{{}}}", render_object_map(map)));
        }
        AttrValue::Expression(expr) => {
            out.push_str(&format!(" {name}={{{}}}", expr.text()));
        }
    }
}

fn render_object_map(
    map: &indexmap::IndexMap<scena_core::identifier::Id, AttrValue>,
) -> String {
    let entries: Vec<String> = map
        .iter()
        .map(|(key, value)| format!("{}: {}", key, render_object_value(value)))
        .collect();
    format!("{{{}}}", entries.join(", "))
}

fn render_object_value(value: &AttrValue) -> String {
    match value {
        AttrValue::Str(text) => format!("\"{}\"", escape_string(text)),
        AttrValue::Number(number) => format_number(*number),
        AttrValue::Bool(flag) => flag.to_string(),
        AttrValue::Object(map) => render_object_map(map),
        AttrValue::Expression(expr) => expr.text().to_string(),
    }
}

fn escape_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_minimal() {
        let doc = scena_parser::parse("<composition/>").unwrap();
        assert_eq!(generate(&doc), "<composition/>\n");
    }

    #[test]
    fn test_generate_attributes_in_order() {
        let doc = scena_parser::parse(
            r#"<clip name="intro" from={0} rate={0.5} active={true} hidden={false} loop/>"#,
        )
        .unwrap();
        assert_eq!(
            generate(&doc),
            "<clip name=\"intro\" from={0} rate={0.5} active hidden={false} loop />\n"
        );
    }

    #[test]
    fn test_generate_nested_structure() {
        let doc = scena_parser::parse(
            "<composition><group>{let n = 3}<title>Hi</title>{clock()}</group></composition>",
        )
        .unwrap();
        let text = generate(&doc);
        let expected = "\
<composition>
  <group>
    {let n = 3}
    <title>
      Hi
    </title>
    {clock()}
  </group>
</composition>
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_generate_style_object() {
        let doc = scena_parser::parse(
            "<background style={{opacity: interpolate(clock(), [0, 30], [0, 1]), color: \"#111\"}}/>",
        )
        .unwrap();
        assert_eq!(
            generate(&doc),
            "<background style={{opacity: interpolate(clock(), [0, 30], [0, 1]), color: \"#111\"}} />\n"
        );
    }

    #[test]
    fn test_round_trip_is_idempotent() {
        let source = r#"
            <composition width={1920} height={1080}>
              {let palette = [2, 3, 5, 8, 13]}
              <background id="bg" class="layer base"
                          style={{opacity: interpolate(clock(), [0, 30], [0, 1])}}>
                <title class="headline">Launch day</title>
              </background>
              <particle-field count={24} loop />
            </composition>
        "#;
        let first = generate(&scena_parser::parse(source).unwrap());
        let second = generate(&scena_parser::parse(&first).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn test_generated_string_escapes_survive_reparse() {
        let doc = scena_parser::parse(r#"<title caption="a\nb \"c\""/>"#).unwrap();
        let text = generate(&doc);
        let again = scena_parser::parse(&text).unwrap();
        assert_eq!(doc, again);
    }
}

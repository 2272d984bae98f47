use crate::wizard::form::{FormControl, StepForm};
use crate::wizard::state::{FieldId, FieldKind};

// Forgiving scanner for the step fragments the wizard server returns. It
// extracts the form, its controls, and the step buttons; anything it does not
// recognize is skipped. A fragment without a <form> yields no projection.

#[derive(Debug, Clone, PartialEq, Eq)]
struct Tag {
    name: String,
    attrs: Vec<(String, String)>,
}

impl Tag {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|(key, _)| key == name)
    }
}

fn decode_entities(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

// Attribute list of a single tag body (between the tag name and `>`).
fn parse_attributes(raw: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut rest = raw.trim_start();
    while !rest.is_empty() && rest != "/" {
        let name_end = rest
            .find(|ch: char| ch == '=' || ch.is_whitespace())
            .unwrap_or(rest.len());
        let name = rest[..name_end].trim_end_matches('/').to_ascii_lowercase();
        rest = rest[name_end..].trim_start();
        if name.is_empty() {
            break;
        }
        if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            let (value, remaining) = match after_eq.chars().next() {
                Some(quote @ ('"' | '\'')) => {
                    let body = &after_eq[1..];
                    match body.find(quote) {
                        Some(end) => (body[..end].to_string(), &body[end + 1..]),
                        None => (body.to_string(), ""),
                    }
                }
                _ => {
                    let end = after_eq
                        .find(|ch: char| ch.is_whitespace())
                        .unwrap_or(after_eq.len());
                    (after_eq[..end].to_string(), &after_eq[end..])
                }
            };
            attrs.push((name, decode_entities(&value)));
            rest = remaining.trim_start();
        } else {
            // Bare attribute such as `checked` or `selected`.
            attrs.push((name, String::new()));
        }
    }
    attrs
}

// Returns the tag (None for closing/comment/doctype) and the offset just
// past it, so the caller can capture inner text for textarea/option.
fn next_tag(markup: &str, from: usize) -> Option<(Option<Tag>, usize, usize)> {
    let open = markup[from..].find('<')? + from;
    let after = &markup[open + 1..];
    if after.starts_with("!--") {
        let end = markup[open..]
            .find("-->")
            .map(|idx| open + idx + 3)
            .unwrap_or(markup.len());
        return Some((None, open, end));
    }
    if after.starts_with('!') || after.starts_with('/') {
        let end = markup[open..]
            .find('>')
            .map(|idx| open + idx + 1)
            .unwrap_or(markup.len());
        return Some((None, open, end));
    }
    let close = match markup[open..].find('>') {
        Some(idx) => open + idx,
        None => return Some((None, open, markup.len())),
    };
    let body = &markup[open + 1..close];
    let name_end = body
        .find(|ch: char| ch.is_whitespace() || ch == '/')
        .unwrap_or(body.len());
    let name = body[..name_end].to_ascii_lowercase();
    let attrs = parse_attributes(&body[name_end..]);
    Some((Some(Tag { name, attrs }), open, close + 1))
}

fn inner_text_until(markup: &str, from: usize, closing: &str) -> (String, usize) {
    match markup[from..].find(closing) {
        Some(idx) => (markup[from..from + idx].trim().to_string(), from + idx),
        None => (markup[from..].trim().to_string(), markup.len()),
    }
}

fn parse_step_attr(tag: &Tag) -> Option<u32> {
    tag.attr("data-step")?.trim().parse().ok()
}

pub fn parse_fragment(markup: &str) -> Option<StepForm> {
    let mut form: Option<StepForm> = None;
    let mut select_field: Option<FieldId> = None;
    let mut cursor = 0usize;

    while let Some((tag, _, next)) = next_tag(markup, cursor) {
        cursor = next;
        let Some(tag) = tag else { continue };
        match tag.name.as_str() {
            "form" => {
                if form.is_none() {
                    let step = parse_step_attr(&tag).unwrap_or(1);
                    let route = tag.attr("data-route").unwrap_or("").to_string();
                    form = Some(StepForm::new(step, route));
                }
            }
            "input" => {
                let Some(target) = form.as_mut() else { continue };
                push_input(target, &tag);
            }
            "textarea" => {
                let Some(name) = tag.attr("name") else { continue };
                let Ok(field) = FieldId::parse(name) else {
                    cursor = skip_past(markup, cursor, "</textarea>");
                    continue;
                };
                let (text, end) = inner_text_until(markup, cursor, "</textarea");
                cursor = skip_past(markup, end, ">");
                if let Some(target) = form.as_mut() {
                    if field.kind() == FieldKind::Scalar {
                        target.push_control(FormControl::Text {
                            field,
                            value: decode_entities(&text),
                            placeholder: tag.attr("placeholder").unwrap_or("").to_string(),
                        });
                    }
                }
            }
            "select" => {
                select_field = tag
                    .attr("name")
                    .and_then(|name| FieldId::parse(name).ok())
                    .filter(|field| field.kind() == FieldKind::Scalar);
            }
            "option" => {
                let (Some(field), Some(target)) = (select_field, form.as_mut()) else {
                    continue;
                };
                if let Some(value) = tag.attr("value") {
                    target.push_radio(field, value, tag.has_attr("selected"));
                }
            }
            "button" => {
                let Some(target) = form.as_mut() else { continue };
                if let (Some(step), Some(route)) = (parse_step_attr(&tag), tag.attr("data-route")) {
                    target.push_nav_target(step, route);
                }
            }
            _ => {}
        }
        // A select group ends at the first unrelated control tag.
        if matches!(tag.name.as_str(), "input" | "textarea" | "form" | "button") {
            select_field = None;
        }
    }

    form
}

fn skip_past(markup: &str, from: usize, needle: &str) -> usize {
    markup[from..]
        .find(needle)
        .map(|idx| from + idx + needle.len())
        .unwrap_or(markup.len())
}

fn push_input(form: &mut StepForm, tag: &Tag) {
    let kind = tag.attr("type").unwrap_or("text").to_ascii_lowercase();
    let Some(name) = tag.attr("name") else { return };
    if kind == "hidden" {
        form.push_control(FormControl::Hidden {
            name: name.to_string(),
            value: tag.attr("value").unwrap_or("").to_string(),
        });
        return;
    }
    let Ok(field) = FieldId::parse(name) else {
        return;
    };
    match (kind.as_str(), field.kind()) {
        ("checkbox", FieldKind::Set) => {
            form.push_choice(field, tag.attr("value").unwrap_or("on"), tag.has_attr("checked"));
        }
        ("checkbox", FieldKind::Flag) => {
            form.push_flag(field, tag.has_attr("checked"));
        }
        ("radio", FieldKind::Scalar) => {
            form.push_radio(field, tag.attr("value").unwrap_or(""), tag.has_attr("checked"));
        }
        (_, FieldKind::Scalar) => {
            form.push_control(FormControl::Text {
                field,
                value: tag.attr("value").unwrap_or("").to_string(),
                placeholder: tag.attr("placeholder").unwrap_or("").to_string(),
            });
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAGMENT: &str = r#"
        <div class="wizard-step">
          <!-- rendered by the step server -->
          <form data-step="1" data-route="essentials" method="get">
            <input type="text" name="projectName" value="" placeholder="my-project" maxlength="64">
            <textarea name="description" placeholder="What are you building?">a &quot;demo&quot;</textarea>
            <select name="preset">
              <option value="standard" selected>Standard</option>
              <option value="minimal">Minimal</option>
            </select>
            <input type="checkbox" name="css" value="tailwind" checked>
            <input type="checkbox" name="css" value="bulma">
            <input type="hidden" name="sessionHint" value="abc123">
            <button type="button" data-step="2" data-route="tooling">Next</button>
          </form>
        </div>
    "#;

    #[test]
    fn parses_controls_and_nav_targets_from_a_fragment() {
        let form = parse_fragment(FRAGMENT).expect("form present");
        assert_eq!(form.step, 1);
        assert_eq!(form.route, "essentials");
        assert_eq!(form.scalar_value(FieldId::ProjectName), Some(String::new()));
        assert_eq!(
            form.scalar_value(FieldId::Description),
            Some("a \"demo\"".to_string())
        );
        assert_eq!(form.scalar_value(FieldId::Preset), Some("standard".to_string()));
        assert_eq!(
            form.checked_values(FieldId::CssFrameworks),
            std::collections::BTreeSet::from_iter(["tailwind".to_string()])
        );
        assert_eq!(form.hidden_fields(), vec![("sessionHint".to_string(), "abc123".to_string())]);
        assert_eq!(form.nav_targets.len(), 1);
        assert_eq!(form.nav_targets[0].step, 2);
    }

    #[test]
    fn unknown_markup_is_skipped_without_failing() {
        let form = parse_fragment(
            "<form data-step=\"3\" data-route=\"review\"><video src=x></video>\
             <input type=\"text\" name=\"outputDir\" value=\"out\"><wbr></form>",
        )
        .expect("form present");
        assert_eq!(form.route, "review");
        assert_eq!(form.scalar_value(FieldId::OutputDir), Some("out".to_string()));
    }

    #[test]
    fn fragment_without_a_form_yields_no_projection() {
        assert!(parse_fragment("<div><p>loading</p></div>").is_none());
    }

    #[test]
    fn attribute_parser_handles_quote_styles_and_bare_attrs() {
        let attrs = parse_attributes(r#" name="css" value='tailwind' checked data-x=plain "#);
        assert_eq!(
            attrs,
            vec![
                ("name".to_string(), "css".to_string()),
                ("value".to_string(), "tailwind".to_string()),
                ("checked".to_string(), String::new()),
                ("data-x".to_string(), "plain".to_string()),
            ]
        );
    }
}

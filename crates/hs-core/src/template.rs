//! `<<name>>` template substitution.
//!
//! Resolution walks an explicit stack of frames, one per variable currently
//! being expanded, so the set of names on the active path is always known.
//! A token whose expansion would re-enter a name on that path is abandoned
//! as a whole and emitted as its literal text.

use std::sync::OnceLock;

use regex::Regex;

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"<<([^>]*)>>").expect("template token regex must compile"))
}

pub fn has_tokens(text: &str) -> bool {
    token_regex().is_match(text)
}

/// Substitutes every `<<name>>` in `template` using `lookup`.
///
/// Unknown names stay literal. Names that would expand into themselves stay
/// literal at the outermost token that started the cycle.
pub fn resolve_template<F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    resolve_with_visited(template, &[], &lookup)
}

/// Same as [`resolve_template`], treating `visited` as already being expanded.
pub fn resolve_with_visited<F>(template: &str, visited: &[&str], lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len());
    let mut last = 0usize;

    for captures in token_regex().captures_iter(template) {
        let (Some(full), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        out.push_str(&template[last..full.start()]);
        last = full.end();

        let name = name.as_str();
        if visited.contains(&name) {
            out.push_str(full.as_str());
            continue;
        }
        match lookup(name).and_then(|value| expand(name, value, visited, lookup)) {
            Some(expanded) => out.push_str(&expanded),
            None => out.push_str(full.as_str()),
        }
    }

    out.push_str(&template[last..]);
    out
}

struct Frame {
    name: String,
    text: String,
    pos: usize,
    out: String,
}

impl Frame {
    fn new(name: &str, text: String) -> Self {
        Self {
            name: name.to_string(),
            out: String::with_capacity(text.len()),
            text,
            pos: 0,
        }
    }
}

/// Fully expands the value of `name`. `None` means a cycle was hit somewhere
/// below it.
fn expand<F>(name: &str, value: String, visited: &[&str], lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut stack = vec![Frame::new(name, value)];

    loop {
        let top = stack.last_mut()?;
        let next = token_regex()
            .captures_at(&top.text, top.pos)
            .and_then(|captures| Some((captures.get(0)?.range(), captures.get(1)?.as_str().to_string())));

        let Some((range, inner)) = next else {
            let finished = stack.pop()?;
            let mut out = finished.out;
            out.push_str(&finished.text[finished.pos..]);
            match stack.last_mut() {
                Some(parent) => parent.out.push_str(&out),
                None => return Some(out),
            }
            continue;
        };

        let literal = top.text[range.clone()].to_string();
        let before = top.text[top.pos..range.start].to_string();
        top.out.push_str(&before);
        top.pos = range.end;

        let on_path = visited.contains(&inner.as_str())
            || stack.iter().any(|frame| frame.name == inner);
        match lookup(&inner) {
            None => {
                if let Some(top) = stack.last_mut() {
                    top.out.push_str(&literal);
                }
            }
            Some(_) if on_path => return None,
            Some(value) => stack.push(Frame::new(&inner, value)),
        }
    }
}

#[cfg(test)]
mod template_tests {
    use super::*;

    use std::collections::BTreeMap;

    fn vars(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn resolve(template: &str, entries: &[(&str, &str)]) -> String {
        let vars = vars(entries);
        resolve_template(template, |name| vars.get(name).cloned())
    }

    #[test]
    fn plain_text_is_returned_unchanged() {
        assert_eq!(resolve("https://example.com/a", &[("a", "b")]), "https://example.com/a");
    }

    #[test]
    fn nested_tokens_resolve_recursively() {
        let entries = [
            ("url", "<<scheme>>://<<host>>/v1"),
            ("scheme", "https"),
            ("host", "<<sub>>.example.com"),
            ("sub", "api"),
        ];
        assert_eq!(resolve("<<url>>/users", &entries), "https://api.example.com/v1/users");
    }

    #[test]
    fn unknown_tokens_stay_literal_at_any_depth() {
        assert_eq!(resolve("<<missing>>!", &[]), "<<missing>>!");
        assert_eq!(resolve("<<a>>", &[("a", "x<<missing>>y")]), "x<<missing>>y");
    }

    #[test]
    fn cycles_leave_the_outermost_token_literal() {
        let entries = [("a", "<<b>>"), ("b", "<<a>>")];
        assert_eq!(resolve("<<a>> and <<b>>", &entries), "<<a>> and <<b>>");
    }

    #[test]
    fn self_reference_is_a_cycle() {
        assert_eq!(resolve("<<a>>", &[("a", "pre-<<a>>")]), "<<a>>");
    }

    #[test]
    fn cycle_in_one_token_does_not_affect_siblings() {
        let entries = [("a", "<<a>>"), ("b", "fine")];
        assert_eq!(resolve("<<a>>/<<b>>", &entries), "<<a>>/fine");
    }

    #[test]
    fn repeated_names_outside_the_active_path_are_not_cycles() {
        let entries = [("pair", "<<x>>-<<x>>"), ("x", "1")];
        assert_eq!(resolve("<<pair>>", &entries), "1-1");
    }

    #[test]
    fn visited_seed_blocks_reentry() {
        let vars = vars(&[("a", "<<hello>>"), ("hello", "<<a>>")]);
        let lookup = |name: &str| vars.get(name).cloned();
        assert_eq!(resolve_with_visited("<<hello>>", &["a"], &lookup), "<<hello>>");
    }

    #[test]
    fn token_names_run_to_the_first_closing_bracket() {
        let entries = [("a", "A"), ("b", "B")];
        assert_eq!(resolve("<<a<<b>>", &entries), "<<a<<b>>");
        assert_eq!(resolve("<<a<<b>>", &[("a<<b", "joined")]), "joined");
        assert_eq!(resolve("<<a>><<b>>", &entries), "AB");
    }

    #[test]
    fn has_tokens_detects_placeholders() {
        assert!(has_tokens("a <<b>> c"));
        assert!(!has_tokens("a << b"));
    }
}

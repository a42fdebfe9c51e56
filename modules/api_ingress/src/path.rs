//! Path templates such as `/v1/host/{id}/ssh`.
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

/// Request path split into segments; one trailing slash is ignored.
fn split(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

impl PathTemplate {
    pub fn parse(raw: &str) -> Result<Self, String> {
        if !raw.starts_with('/') {
            return Err("template must start with '/'".to_string());
        }
        let mut seen = HashSet::new();
        let mut segments = Vec::new();
        for seg in split(raw) {
            if seg.is_empty() {
                return Err("empty path segment".to_string());
            }
            if let Some(name) = seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                let valid = !name.is_empty()
                    && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
                if !valid {
                    return Err(format!("bad parameter name '{name}'"));
                }
                if !seen.insert(name.to_string()) {
                    return Err(format!("parameter '{name}' appears twice"));
                }
                segments.push(Segment::Param(name.to_string()));
            } else if seg.contains(['{', '}']) {
                return Err(format!("parameter must span the whole segment: '{seg}'"));
            } else {
                segments.push(Segment::Literal(seg.to_string()));
            }
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Bind `path` against the template. Each parameter takes exactly one
    /// non-empty segment, percent-decoded after splitting.
    pub fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
        let parts = split(path);
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut values = Vec::new();
        for (seg, part) in self.segments.iter().zip(parts) {
            match seg {
                Segment::Literal(lit) => {
                    if lit != part {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    let decoded = urlencoding::decode(part).ok()?;
                    values.push((name.clone(), decoded.into_owned()));
                }
            }
        }
        Some(values)
    }

    /// Whether some concrete path could match both templates.
    pub fn overlaps(&self, other: &PathTemplate) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Literal(a), Segment::Literal(b)) => a == b,
                    _ => true,
                })
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(raw: &str) -> PathTemplate {
        PathTemplate::parse(raw).unwrap()
    }

    #[test]
    fn binds_named_segments() {
        let tpl = t("/v1/host/{id}/ssh");
        assert_eq!(
            tpl.matches("/v1/host/abc/ssh"),
            Some(vec![("id".to_string(), "abc".to_string())])
        );
        assert_eq!(tpl.param_names().collect::<Vec<_>>(), vec!["id"]);
    }

    #[test]
    fn trailing_slash_is_ignored() {
        assert!(t("/v1/hosts").matches("/v1/hosts/").is_some());
        assert!(t("/v1/host/{id}").matches("/v1/host/abc/").is_some());
    }

    #[test]
    fn params_never_cross_or_skip_segments() {
        let tpl = t("/v1/host/{id}");
        assert!(tpl.matches("/v1/host/a/b").is_none());
        assert!(tpl.matches("/v1/host//").is_none());
        assert!(tpl.matches("/v1/host").is_none());
        assert!(tpl.matches("/v1/hosts/a").is_none());
    }

    #[test]
    fn values_are_percent_decoded() {
        let got = t("/v1/host/{id}").matches("/v1/host/my%20host%2F1").unwrap();
        assert_eq!(got[0].1, "my host/1");
    }

    #[test]
    fn rejects_malformed_templates() {
        assert!(PathTemplate::parse("v1/hosts").is_err());
        assert!(PathTemplate::parse("/v1/{}").is_err());
        assert!(PathTemplate::parse("/v1/x{id}").is_err());
        assert!(PathTemplate::parse("/v1/{id}/{id}").is_err());
        assert!(PathTemplate::parse("/v1//x").is_err());
    }

    #[test]
    fn overlap_detection() {
        assert!(t("/v1/host/{id}").overlaps(&t("/v1/host/{name}")));
        assert!(t("/v1/host/{id}").overlaps(&t("/v1/host/special")));
        assert!(!t("/v1/host/{id}").overlaps(&t("/v1/hosts/{id}")));
        assert!(!t("/v1/host/{id}/ssh").overlaps(&t("/v1/host/{id}/security_groups")));
        assert!(!t("/v1/host").overlaps(&t("/v1/host/{id}")));
    }
}

//! Path pattern matching.

use crate::error::{Result, RouterError};
use crate::request::PathParams;

/// The pattern that matches every path.
pub const WILDCARD: &str = "*";

/// A segment in a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A literal string segment.
    Literal(String),
    /// A parameter segment (e.g., `:id`), matching exactly one path segment.
    Param(String),
    /// A greedy parameter (e.g., `:rest*`), matching the remainder of the path.
    Greedy(String),
}

#[derive(Debug, Clone)]
enum Shape {
    Any,
    Segments(Vec<PathSegment>),
}

/// A parsed path pattern for matching request paths.
#[derive(Debug, Clone)]
pub struct PathPattern {
    /// The original pattern string.
    pattern: String,
    shape: Shape,
}

/// Strips one leading and one trailing slash, then splits on `/`.
///
/// An empty input yields a single empty segment.
pub(crate) fn split_path(path: &str) -> Vec<&str> {
    let path = path.strip_prefix('/').unwrap_or(path);
    let path = path.strip_suffix('/').unwrap_or(path);
    path.split('/').collect()
}

impl PathPattern {
    /// Parses a path pattern string.
    ///
    /// Pattern syntax:
    /// - `*` - Matches every path
    /// - `/users` - Literal path
    /// - `/users/:id` - Path with parameter
    /// - `/files/:rest*` - Greedy parameter (matches rest of path, must be last)
    ///
    /// # Example
    ///
    /// ```
    /// use switchyard::PathPattern;
    ///
    /// let pattern = PathPattern::parse("/posts/:id/comments/:comment_id").unwrap();
    /// let params = pattern.match_path("/posts/123/comments/456").unwrap();
    /// assert_eq!(params.get("id"), Some("123"));
    /// assert_eq!(params.get("comment_id"), Some("456"));
    /// ```
    pub fn parse(pattern: &str) -> Result<Self> {
        if pattern == WILDCARD {
            return Ok(Self::wildcard());
        }

        let parts = split_path(pattern);
        let last = parts.len() - 1;
        let mut segments = Vec::with_capacity(parts.len());

        for (i, part) in parts.into_iter().enumerate() {
            let Some(param) = part.strip_prefix(':') else {
                segments.push(PathSegment::Literal(part.to_string()));
                continue;
            };

            let (name, greedy) = match param.strip_suffix('*') {
                Some(name) => (name, true),
                None => (param, false),
            };
            if name.is_empty() {
                return Err(invalid(pattern, "parameter name is empty"));
            }
            if greedy && i != last {
                return Err(invalid(pattern, "greedy parameter must be the last segment"));
            }

            segments.push(if greedy {
                PathSegment::Greedy(name.to_string())
            } else {
                PathSegment::Param(name.to_string())
            });
        }

        Ok(Self {
            pattern: pattern.to_string(),
            shape: Shape::Segments(segments),
        })
    }

    /// Returns the pattern that matches every path.
    pub fn wildcard() -> Self {
        Self {
            pattern: WILDCARD.to_string(),
            shape: Shape::Any,
        }
    }

    /// Attempts to match a path against this pattern.
    ///
    /// Returns the extracted parameters if the path matches. The
    /// wildcard pattern matches everything with no parameters.
    pub fn match_path(&self, path: &str) -> Option<PathParams> {
        let segments = match &self.shape {
            Shape::Any => return Some(PathParams::new()),
            Shape::Segments(segments) => segments,
        };

        let parts = split_path(path);
        let greedy = matches!(segments.last(), Some(PathSegment::Greedy(_)));
        if parts.len() != segments.len() && !greedy {
            return None;
        }

        let mut params = PathParams::new();
        for (i, segment) in segments.iter().enumerate() {
            match segment {
                PathSegment::Literal(literal) => {
                    if parts.get(i) != Some(&literal.as_str()) {
                        return None;
                    }
                }
                PathSegment::Param(name) => {
                    params.insert(name.as_str(), *parts.get(i)?);
                }
                PathSegment::Greedy(name) => {
                    let rest = parts.get(i..).map(|rest| rest.join("/"));
                    params.insert(name.as_str(), rest.unwrap_or_default());
                    break;
                }
            }
        }

        Some(params)
    }

    /// Returns the original pattern string.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns true for the universal wildcard pattern.
    pub fn is_wildcard(&self) -> bool {
        matches!(self.shape, Shape::Any)
    }

    /// Returns the parsed segments (empty for the wildcard).
    pub fn segments(&self) -> &[PathSegment] {
        match &self.shape {
            Shape::Any => &[],
            Shape::Segments(segments) => segments,
        }
    }

    /// Returns the parameter names in order.
    pub fn param_names(&self) -> Vec<&str> {
        self.segments()
            .iter()
            .filter_map(|segment| match segment {
                PathSegment::Param(name) | PathSegment::Greedy(name) => Some(name.as_str()),
                PathSegment::Literal(_) => None,
            })
            .collect()
    }
}

fn invalid(pattern: &str, reason: &str) -> RouterError {
    RouterError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(s: &str) -> PathPattern {
        PathPattern::parse(s).unwrap()
    }

    #[test]
    fn test_literal_path() {
        let pattern = pattern("/users");
        assert!(pattern.match_path("/users").is_some());
        assert!(pattern.match_path("/users/").is_some());
        assert!(pattern.match_path("users").is_some());
        assert!(pattern.match_path("/posts").is_none());
    }

    #[test]
    fn test_single_param() {
        let pattern = pattern("/users/:id");
        let params = pattern.match_path("/users/42").unwrap();
        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.len(), 1);
        assert!(pattern.match_path("/users/42/edit").is_none());
        assert!(pattern.match_path("/users").is_none());
    }

    #[test]
    fn test_multiple_params() {
        let pattern = pattern("/posts/:post_id/comments/:comment_id");
        let params = pattern.match_path("/posts/42/comments/7").unwrap();
        assert_eq!(params.get("post_id"), Some("42"));
        assert_eq!(params.get("comment_id"), Some("7"));
    }

    #[test]
    fn test_literal_mismatch_after_param() {
        let pattern = pattern("/posts/:id/comments");
        assert!(pattern.match_path("/posts/1/likes").is_none());
    }

    #[test]
    fn test_greedy_param() {
        let pattern = pattern("/files/:rest*");
        let params = pattern.match_path("/files/a/b/c").unwrap();
        assert_eq!(params.get("rest"), Some("a/b/c"));

        let params = pattern.match_path("/files/readme.md").unwrap();
        assert_eq!(params.get("rest"), Some("readme.md"));
    }

    #[test]
    fn test_greedy_param_with_nothing_left() {
        let pattern = pattern("/files/:rest*");
        let params = pattern.match_path("/files").unwrap();
        assert_eq!(params.get("rest"), Some(""));
        assert!(pattern.match_path("/other/a").is_none());
    }

    #[test]
    fn test_param_before_greedy_requires_segment() {
        let pattern = pattern("/repo/:owner/:path*");
        assert!(pattern.match_path("/repo").is_none());
        let params = pattern.match_path("/repo/me/src/lib.rs").unwrap();
        assert_eq!(params.get("owner"), Some("me"));
        assert_eq!(params.get("path"), Some("src/lib.rs"));
    }

    #[test]
    fn test_wildcard_matches_everything() {
        let pattern = pattern("*");
        assert!(pattern.is_wildcard());
        for path in ["/", "", "/a", "/a/b/c", "/users/42?x=1"] {
            let params = pattern.match_path(path).unwrap();
            assert!(params.is_empty());
        }
    }

    #[test]
    fn test_root_and_empty_patterns() {
        assert!(pattern("/").match_path("/").is_some());
        assert!(pattern("").match_path("/").is_some());
        assert!(pattern("/").match_path("/a").is_none());
        assert_eq!(
            pattern("").segments(),
            &[PathSegment::Literal(String::new())]
        );
    }

    #[test]
    fn test_segment_count_mismatch_never_matches() {
        let pattern = pattern("/a/:b/c");
        for path in ["/a", "/a/x", "/a/x/c/d", "/a/x/c/d/e"] {
            assert!(pattern.match_path(path).is_none(), "{path} should not match");
        }
    }

    #[test]
    fn test_matching_is_idempotent() {
        let pattern = pattern("/users/:id");
        let first = pattern.match_path("/users/7");
        let second = pattern.match_path("/users/7");
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(matches!(
            PathPattern::parse("/files/:rest*/meta"),
            Err(RouterError::InvalidPattern { .. })
        ));
        assert!(PathPattern::parse("/users/:").is_err());
        assert!(PathPattern::parse("/users/:*").is_err());
    }

    #[test]
    fn test_param_names() {
        let pattern = pattern("/a/:x/b/:y*");
        assert_eq!(pattern.param_names(), vec!["x", "y"]);
        assert_eq!(pattern.pattern(), "/a/:x/b/:y*");
    }
}

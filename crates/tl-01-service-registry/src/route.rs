//! Route patterns and matching.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::Handler;

/// Captured `:name` segments, in path order. BTreeMap keeps iteration
/// deterministic for logging and replay.
pub type PathParams = BTreeMap<String, String>;

/// A resolved route: the handler plus its captured path parameters.
#[derive(Clone)]
pub struct RouteMatch {
    pub handler: Arc<dyn Handler>,
    pub params: PathParams,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Literal(String),
    Param(String),
}

/// A registered pattern route.
pub(crate) struct PatternRoute {
    pub method: String,
    pub segments: Vec<Segment>,
    pub raw: String,
    pub handler: Arc<dyn Handler>,
}

pub(crate) fn parse_pattern(path: &str) -> Vec<Segment> {
    split(path)
        .map(|seg| match seg.strip_prefix(':') {
            Some(name) => Segment::Param(name.to_string()),
            None => Segment::Literal(seg.to_string()),
        })
        .collect()
}

/// Match a concrete path against a pattern, capturing `:name` segments.
pub(crate) fn match_pattern(segments: &[Segment], path: &str) -> Option<PathParams> {
    let parts: Vec<&str> = split(path).collect();
    if parts.len() != segments.len() {
        return None;
    }
    let mut params = PathParams::new();
    for (segment, part) in segments.iter().zip(parts) {
        match segment {
            Segment::Literal(lit) => {
                if lit != part {
                    return None;
                }
            }
            Segment::Param(name) => {
                params.insert(name.clone(), part.to_string());
            }
        }
    }
    Some(params)
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

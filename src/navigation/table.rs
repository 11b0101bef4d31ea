use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use ts_rs::TS;
use utoipa::ToSchema;

use super::{Location, NOT_FOUND_PATH, engine::RouteGuard};

/// RouteMeta
///
/// Auth flags of a single descriptor. Children never inherit them from their parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RouteMeta {
    pub requires_auth: bool,
    pub requires_not_auth: bool,
}

impl RouteMeta {
    pub const AUTH: RouteMeta = RouteMeta {
        requires_auth: true,
        requires_not_auth: false,
    };
    pub const NOT_AUTH: RouteMeta = RouteMeta {
        requires_auth: false,
        requires_not_auth: true,
    };
}

/// Static props handed to the view of a route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RouteProps {
    pub create: bool,
}

/// Route-level redirects, evaluated before any guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteRedirect {
    /// The `specs` route of the last organization the user entered.
    LastOrganization,
}

/// RouteDescriptor
///
/// Declarative definition of one route. Descriptors are assembled into a `RouteTable`
/// once at startup.
pub struct RouteDescriptor {
    pub path: &'static str,
    pub name: Option<&'static str>,
    pub props: Option<RouteProps>,
    pub meta: RouteMeta,
    pub children: Vec<RouteDescriptor>,
    pub guard: Option<Arc<dyn RouteGuard>>,
    pub redirect: Option<RouteRedirect>,
}

impl RouteDescriptor {
    pub fn new(path: &'static str, name: &'static str) -> Self {
        Self {
            path,
            name: Some(name),
            props: None,
            meta: RouteMeta::default(),
            children: vec![],
            guard: None,
            redirect: None,
        }
    }

    /// A descriptor that exists only to group its children.
    pub fn layout(path: &'static str) -> Self {
        Self {
            name: None,
            ..Self::new(path, "")
        }
    }

    pub fn meta(mut self, meta: RouteMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn props(mut self, props: RouteProps) -> Self {
        self.props = Some(props);
        self
    }

    pub fn guard(mut self, guard: impl RouteGuard + 'static) -> Self {
        self.guard = Some(Arc::new(guard));
        self
    }

    pub fn redirect(mut self, redirect: RouteRedirect) -> Self {
        self.redirect = Some(redirect);
        self
    }

    pub fn children(mut self, children: Vec<RouteDescriptor>) -> Self {
        self.children = children;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param { prefix: String, name: String },
    CatchAll,
}

fn compile(pattern: &str) -> Vec<Segment> {
    let trimmed = pattern.strip_prefix('/').unwrap_or(pattern);
    if trimmed.is_empty() {
        return vec![];
    }
    trimmed
        .split('/')
        .map(|segment| match segment.split_once(':') {
            _ if segment == "*" => Segment::CatchAll,
            Some((prefix, name)) => Segment::Param {
                prefix: prefix.to_string(),
                name: name.to_string(),
            },
            None => Segment::Static(segment.to_string()),
        })
        .collect()
}

fn join(parent: &str, child: &str) -> String {
    if child.starts_with('/') {
        child.to_string()
    } else if child.is_empty() {
        parent.to_string()
    } else if parent.ends_with('/') {
        format!("{}{}", parent, child)
    } else {
        format!("{}/{}", parent, child)
    }
}

// Characters escaped when a param value is written into a path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

fn decode(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}

fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        vec![]
    } else {
        trimmed.split('/').collect()
    }
}

/// RouteRecord
///
/// A flattened descriptor: full path pattern, link to its parent record.
pub struct RouteRecord {
    pub id: usize,
    pub parent: Option<usize>,
    pub path: String,
    pub name: Option<&'static str>,
    pub props: Option<RouteProps>,
    pub meta: RouteMeta,
    pub guard: Option<Arc<dyn RouteGuard>>,
    pub redirect: Option<RouteRedirect>,
    segments: Vec<Segment>,
}

impl RouteRecord {
    fn is_catch_all(&self) -> bool {
        self.segments.contains(&Segment::CatchAll)
    }

    fn match_segments(&self, path: &[&str]) -> Option<BTreeMap<String, String>> {
        let pattern = &self.segments;
        let mut path = path;
        // One trailing slash is tolerated.
        if path.len() == pattern.len() + 1 && path.last() == Some(&"") {
            path = &path[..pattern.len()];
        }

        let mut params = BTreeMap::new();
        for (i, segment) in pattern.iter().enumerate() {
            match segment {
                Segment::CatchAll => {
                    let rest: Vec<String> =
                        path[i..].iter().map(|segment| decode(segment)).collect();
                    params.insert("pathMatch".to_string(), rest.join("/"));
                    return Some(params);
                }
                Segment::Static(expected) => {
                    if path.get(i)? != expected {
                        return None;
                    }
                }
                Segment::Param { prefix, name } => {
                    let value = path.get(i)?.strip_prefix(prefix.as_str())?;
                    params.insert(name.clone(), decode(value));
                }
            }
        }
        (path.len() == pattern.len()).then_some(params)
    }

    fn build_path(&self, params: &BTreeMap<String, String>) -> String {
        let segments: Vec<String> = self
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Static(s) => s.clone(),
                Segment::Param { prefix, name } => {
                    let value = params.get(name).map(String::as_str).unwrap_or("");
                    format!("{}{}", prefix, encode(value))
                }
                Segment::CatchAll => params
                    .get("pathMatch")
                    .map(|rest| rest.split('/').map(encode).collect::<Vec<_>>().join("/"))
                    .unwrap_or_default(),
            })
            .collect();
        format!("/{}", segments.join("/"))
    }
}

/// Route
///
/// A resolved target: the matched chain (root first) plus params and query.
pub struct Route<'a> {
    pub path: String,
    pub params: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub matched: Vec<&'a RouteRecord>,
}

impl<'a> Route<'a> {
    pub fn leaf(&self) -> &'a RouteRecord {
        // A route is only built from a non-empty chain.
        self.matched[self.matched.len() - 1]
    }

    pub fn name(&self) -> Option<&'static str> {
        self.leaf().name
    }

    /// Decoded path param by name, empty when absent.
    pub fn param(&self, name: &str) -> &str {
        self.params.get(name).map(String::as_str).unwrap_or("")
    }

    /// Query param by name, empty when absent.
    pub fn query(&self, name: &str) -> &str {
        self.query.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn full_path(&self) -> String {
        Location {
            path: self.path.clone(),
            query: self.query.clone(),
        }
        .full_path()
    }

    pub fn requires_auth(&self) -> bool {
        self.matched.iter().any(|record| record.meta.requires_auth)
    }

    pub fn requires_not_auth(&self) -> bool {
        self.matched.iter().any(|record| record.meta.requires_not_auth)
    }
}

/// RouteTable
///
/// Immutable, flattened route definitions. Children are matched before their parent,
/// in declaration order, and catch-all routes always come last.
pub struct RouteTable {
    records: Vec<RouteRecord>,
    match_order: Vec<usize>,
}

impl RouteTable {
    pub fn new(routes: Vec<RouteDescriptor>) -> Self {
        let mut records = Vec::new();
        let mut order = Vec::new();
        for descriptor in routes {
            flatten(descriptor, None, "", &mut records, &mut order);
        }
        let (catch_all, mut match_order): (Vec<usize>, Vec<usize>) =
            order.into_iter().partition(|&id| records[id].is_catch_all());
        match_order.extend(catch_all);
        Self {
            records,
            match_order,
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &RouteRecord> {
        self.match_order.iter().map(|&id| &self.records[id])
    }

    pub fn by_name(&self, name: &str) -> Option<&RouteRecord> {
        self.records.iter().find(|record| record.name == Some(name))
    }

    /// resolve
    ///
    /// Matches `path` against the table. Returns None only when nothing matches and the
    /// table has no catch-all.
    pub fn resolve(&self, path: &str, query: BTreeMap<String, String>) -> Option<Route<'_>> {
        let segments = split_path(path);
        self.match_order.iter().find_map(|&id| {
            let record = &self.records[id];
            record.match_segments(&segments).map(|params| Route {
                path: path.to_string(),
                params,
                query: query.clone(),
                matched: self.chain(record),
            })
        })
    }

    /// Location of a named route with the given params. Unknown names resolve to the
    /// not-found location.
    pub fn location(&self, name: &str, params: &[(&str, &str)]) -> Location {
        let params: BTreeMap<String, String> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        match self.by_name(name) {
            Some(record) => Location::path(record.build_path(&params)),
            None => {
                tracing::warn!(route = name, "redirect to unknown route name");
                Location::path(NOT_FOUND_PATH)
            }
        }
    }

    fn chain<'a>(&'a self, leaf: &'a RouteRecord) -> Vec<&'a RouteRecord> {
        let mut chain = vec![leaf];
        let mut current = leaf;
        while let Some(parent) = current.parent {
            current = &self.records[parent];
            chain.push(current);
        }
        chain.reverse();
        chain
    }
}

fn flatten(
    descriptor: RouteDescriptor,
    parent: Option<usize>,
    parent_path: &str,
    records: &mut Vec<RouteRecord>,
    order: &mut Vec<usize>,
) {
    let id = records.len();
    let path = match parent {
        Some(_) => join(parent_path, descriptor.path),
        None => descriptor.path.to_string(),
    };
    records.push(RouteRecord {
        id,
        parent,
        segments: compile(&path),
        path: path.clone(),
        name: descriptor.name,
        props: descriptor.props,
        meta: descriptor.meta,
        guard: descriptor.guard,
        redirect: descriptor.redirect,
    });
    for child in descriptor.children {
        flatten(child, Some(id), &path, records, order);
    }
    order.push(id);
}

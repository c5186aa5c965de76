use std::collections::BTreeMap;

/// Who may enter a route. Enforced client-side only; the API checks again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredAuth {
    None,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Title {
    /// Just the application name
    App,
    /// `<app> - <page>`
    Page(&'static str),
    Fixed(&'static str),
}

#[derive(Debug, PartialEq, Eq)]
pub struct Route {
    /// Route name; `None` for pure layout parents whose empty-path child carries the name
    pub name: Option<&'static str>,
    /// Absolute, or relative to the parent when it does not start with `/`
    pub path: &'static str,
    title: Title,
    pub required_auth: RequiredAuth,
    pub children: &'static [Route],
}

impl Route {
    pub fn title(&self, app_name: &str) -> String {
        match self.title {
            Title::App => app_name.to_string(),
            Title::Page(page) => format!("{} - {}", app_name, page),
            Title::Fixed(title) => title.to_string(),
        }
    }
}

const fn leaf(name: &'static str, path: &'static str, title: Title, required_auth: RequiredAuth) -> Route {
    Route {
        name: Some(name),
        path,
        title,
        required_auth,
        children: &[],
    }
}

const fn layout(path: &'static str, children: &'static [Route]) -> Route {
    Route {
        name: None,
        path,
        title: Title::App,
        required_auth: RequiredAuth::None,
        children,
    }
}

const OAI_PMH_CHILDREN: &[Route] = &[
    leaf("OaiPmh", "", Title::Page("OAI-PMH Identify"), RequiredAuth::None),
    leaf("OaiIdentify", "identify", Title::Page("OAI-PMH Identify"), RequiredAuth::None),
    leaf("OaiGetRecord", "get-record", Title::Page("OAI-PMH Get Record"), RequiredAuth::None),
    leaf("OaiListRecords", "list-records", Title::Page("OAI-PMH List Records"), RequiredAuth::None),
];

const ADMIN_CHILDREN: &[Route] = &[
    leaf("Dashboard", "", Title::Page("Dashboard"), RequiredAuth::Admin),
    leaf("Variables", "/variables", Title::Page("Manage Variables"), RequiredAuth::Admin),
];

pub static ROUTES: &[Route] = &[
    leaf("Home", "/", Title::App, RequiredAuth::None),
    layout("/oai-pmh", OAI_PMH_CHILDREN),
    leaf("Map", "/map", Title::Page("Map"), RequiredAuth::None),
    leaf("Cenote", "/cenote/:key", Title::Page("Cenote"), RequiredAuth::None),
    layout("/admin", ADMIN_CHILDREN),
    leaf("Login", "/login", Title::Page("Login"), RequiredAuth::None),
    leaf("Signup", "/signup", Title::Page("Signup"), RequiredAuth::None),
    leaf("NotFound", "**", Title::Fixed("Page Not Found"), RequiredAuth::None),
];

#[derive(Debug, PartialEq, Eq)]
pub struct RouteMatch {
    pub route: &'static Route,
    pub params: BTreeMap<String, String>,
}

/// Outcome of the navigation guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Proceed,
    Redirect(&'static str),
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn full_path(parent: &str, path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else if path.is_empty() {
        parent.to_string()
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), path)
    }
}

fn match_pattern(pattern: &str, path: &str) -> Option<BTreeMap<String, String>> {
    if pattern == "**" {
        return Some(BTreeMap::new());
    }
    let expected = segments(pattern);
    let actual = segments(path);
    if expected.len() != actual.len() {
        return None;
    }

    let mut params = BTreeMap::new();
    for (want, got) in expected.iter().zip(&actual) {
        match want.strip_prefix(':') {
            Some(name) => {
                params.insert(name.to_string(), got.to_string());
            }
            None if want == got => {}
            None => return None,
        }
    }
    Some(params)
}

fn find(routes: &'static [Route], parent: &str, path: &str) -> Option<RouteMatch> {
    for route in routes {
        let pattern = full_path(parent, route.path);
        if !route.children.is_empty() {
            if let Some(found) = find(route.children, &pattern, path) {
                return Some(found);
            }
            continue;
        }
        if let Some(params) = match_pattern(&pattern, path) {
            return Some(RouteMatch { route, params });
        }
    }
    None
}

/// First route matching `path` in declaration order. Query and fragment are ignored.
pub fn resolve(path: &str) -> Option<RouteMatch> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    find(ROUTES, "", path)
}

/// `None` routes always proceed; `Admin` routes only for an admin session
pub fn guard(route: &Route, is_admin: bool) -> Navigation {
    match route.required_auth {
        RequiredAuth::None => Navigation::Proceed,
        RequiredAuth::Admin if is_admin => Navigation::Proceed,
        RequiredAuth::Admin => Navigation::Redirect("/"),
    }
}

//! Navigation surface and the session gate in front of it.

use crate::models::ListingId;
use crate::session::SessionState;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Listings,
    ListingDetail(ListingId),
    About,
    Contact,
    CreditSimulation,
    Privacy,
    Login,
    Register,
    Profile,
    Dashboard,
    Favorites,
    Help,
    ListingManagement,
    ListingEdit(ListingId),
    BrokerManagement,
    AnalysisQueue,
    AnalysisDetail(i64),
}

impl Route {
    pub fn access(self) -> Access {
        match self {
            Route::Home
            | Route::Listings
            | Route::ListingDetail(_)
            | Route::About
            | Route::Contact
            | Route::CreditSimulation
            | Route::Privacy
            | Route::Login
            | Route::Register => Access::Public,
            Route::Profile | Route::Favorites | Route::Help => Access::Authenticated,
            Route::Dashboard
            | Route::ListingManagement
            | Route::ListingEdit(_)
            | Route::BrokerManagement
            | Route::AnalysisQueue
            | Route::AnalysisDetail(_) => Access::Admin,
        }
    }

    /// Parse a path such as `/Imoveis/12`; matching ignores case and repeated slashes
    pub fn parse(path: &str) -> Option<Route> {
        let segments: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
            .collect();
        let parts: Vec<&str> = segments.iter().map(String::as_str).collect();

        let id = |raw: &str| raw.parse::<i64>().ok();
        match parts.as_slice() {
            [] => Some(Route::Home),
            ["imoveis"] => Some(Route::Listings),
            ["imoveis", raw] => id(*raw).map(Route::ListingDetail),
            ["sobre"] => Some(Route::About),
            ["contato"] => Some(Route::Contact),
            ["credito"] => Some(Route::CreditSimulation),
            ["privacidade"] => Some(Route::Privacy),
            ["login"] => Some(Route::Login),
            ["cadastro"] => Some(Route::Register),
            ["profile"] => Some(Route::Profile),
            ["dashboard"] => Some(Route::Dashboard),
            ["favoritos"] => Some(Route::Favorites),
            ["ajuda"] => Some(Route::Help),
            ["cadastroimoveis"] => Some(Route::ListingManagement),
            ["imoveisdetalhes", raw] => id(*raw).map(Route::ListingEdit),
            ["corretor"] => Some(Route::BrokerManagement),
            ["analiseimoveis"] => Some(Route::AnalysisQueue),
            ["analiseimoveis", raw] => id(*raw).map(Route::AnalysisDetail),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Home => f.write_str("/"),
            Route::Listings => f.write_str("/Imoveis"),
            Route::ListingDetail(id) => write!(f, "/Imoveis/{id}"),
            Route::About => f.write_str("/Sobre"),
            Route::Contact => f.write_str("/Contato"),
            Route::CreditSimulation => f.write_str("/Credito"),
            Route::Privacy => f.write_str("/Privacidade"),
            Route::Login => f.write_str("/Login"),
            Route::Register => f.write_str("/Cadastro"),
            Route::Profile => f.write_str("/Profile"),
            Route::Dashboard => f.write_str("/Dashboard"),
            Route::Favorites => f.write_str("/Favoritos"),
            Route::Help => f.write_str("/Ajuda"),
            Route::ListingManagement => f.write_str("/Cadastroimoveis"),
            Route::ListingEdit(id) => write!(f, "/Imoveisdetalhes/{id}"),
            Route::BrokerManagement => f.write_str("/Corretor"),
            Route::AnalysisQueue => f.write_str("/AnaliseImoveis"),
            Route::AnalysisDetail(id) => write!(f, "/AnaliseImoveis/{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Render,
    Redirect(Route),
    /// Session not resolved yet; render nothing protected
    Pending,
}

/// Where signed-out and non-admin visitors are sent
pub const LANDING: Route = Route::Home;

pub fn gate(route: Route, session: &SessionState) -> GateDecision {
    let access = route.access();
    if access == Access::Public {
        return GateDecision::Render;
    }

    let user = match session {
        SessionState::Uninitialized | SessionState::Loading => return GateDecision::Pending,
        SessionState::Resolved(None) => return GateDecision::Redirect(LANDING),
        SessionState::Resolved(Some(user)) => user,
    };

    if access == Access::Admin && !user.is_admin() {
        return GateDecision::Redirect(LANDING);
    }
    GateDecision::Render
}

#[derive(Debug, PartialEq)]
pub enum Guarded<T> {
    Rendered(T),
    Redirected(Route),
    Pending,
}

/// Build the protected view only when the gate allows it
pub fn guard<T, F>(route: Route, session: &SessionState, render: F) -> Guarded<T>
where
    F: FnOnce() -> T,
{
    match gate(route, session) {
        GateDecision::Render => Guarded::Rendered(render()),
        GateDecision::Redirect(to) => Guarded::Redirected(to),
        GateDecision::Pending => Guarded::Pending,
    }
}

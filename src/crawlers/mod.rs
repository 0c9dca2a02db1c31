pub mod http;
pub mod orchestrator;
pub mod renderer;
pub mod web;

pub use http::{FetchError, HttpFetch, HttpResponse, ReqwestFetcher};
pub use orchestrator::{Orchestrator, StopHandle};
pub use renderer::{PageRenderer, RenderError, RenderedPage};
pub use web::WebDriverRenderer;

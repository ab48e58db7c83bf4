//! Template functions turning request parameters into markup

use crate::Result;
use futures::future::BoxFuture;
use maud::{Markup, Render};
use std::future::Future;
use std::sync::Arc;

type HtmlFn<P> = Arc<dyn Fn(P) -> BoxFuture<'static, Result<String>> + Send + Sync>;
type ComponentFn<P> = Arc<dyn Fn(P) -> BoxFuture<'static, Result<Markup>> + Send + Sync>;

/// A page template: either returns an HTML string or a component
pub enum Template<P> {
    Html(HtmlFn<P>),
    Component(ComponentFn<P>),
}

impl<P> Clone for Template<P> {
    fn clone(&self) -> Self {
        match self {
            Template::Html(f) => Template::Html(Arc::clone(f)),
            Template::Component(f) => Template::Component(Arc::clone(f)),
        }
    }
}

impl<P> std::fmt::Debug for Template<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Template::Html(_) => f.write_str("Template::Html"),
            Template::Component(_) => f.write_str("Template::Component"),
        }
    }
}

impl<P: Send + 'static> Template<P> {
    /// Template returning an HTML string
    pub fn html<F, Fut>(f: F) -> Self
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        Template::Html(Arc::new(move |params| Box::pin(f(params))))
    }

    /// Template returning a component: `maud::Markup`, a
    /// [`Node`](crate::markup::Node) tree or any other `Render` type
    pub fn component<F, Fut, M>(f: F) -> Self
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<M>> + Send + 'static,
        M: Render + 'static,
    {
        Template::Component(Arc::new(move |params| {
            let component = f(params);
            let markup: BoxFuture<'static, Result<Markup>> =
                Box::pin(async move { Ok(component.await?.render()) });
            markup
        }))
    }

    /// Call the template and normalize its output to markup
    pub async fn render(&self, params: P) -> Result<String> {
        match self {
            Template::Html(f) => f(params).await,
            Template::Component(f) => Ok(f(params).await?.into_string()),
        }
    }
}

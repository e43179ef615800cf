//! Leptos views for pages and their content blocks.
//!
//! Every view takes owned data; callers clone out of the borrowed page.

use leptos::prelude::*;
use quire_core::{ContentBlock, Page};

/// Hot reload via Server-Sent Events, preview only
const RELOAD_SCRIPT: &str = r#"
const eventSource = new EventSource('/_reload');
eventSource.onmessage = () => location.reload();
eventSource.onerror = () => eventSource.close();
"#;

/// Fields shown in the document `<head>`
pub struct HeadMeta {
    pub title: String,
    pub lang: String,
    pub canonical: String,
    pub author: String,
    pub description: Option<String>,
    pub site_title: String,
}

/// Full HTML document around `content`
pub fn document(head: HeadMeta, preview: bool, content: impl IntoView + 'static) -> impl IntoView {
    let HeadMeta {
        title,
        lang,
        canonical,
        author,
        description,
        site_title,
    } = head;

    view! {
        <html lang=lang>
            <head>
                <meta charset="utf-8"/>
                <meta name="viewport" content="width=device-width, initial-scale=1"/>
                <title>{title}</title>
                <meta name="author" content=author/>
                {description.map(|d| view! { <meta name="description" content=d/> })}
                <link rel="canonical" href=canonical/>
                <link rel="stylesheet" href="/static/style.css"/>
            </head>
            <body>
                {preview.then(|| view! { <div class="preview-badge">"Preview - live reload active"</div> })}
                <nav class="site-nav">
                    <a class="site-title" href="/">{site_title}</a>
                    <a href="/posts/">"Posts"</a>
                </nav>
                <main>{content}</main>
                {preview.then(|| view! { <script inner_html=RELOAD_SCRIPT></script> })}
            </body>
        </html>
    }
}

/// An article: metadata header followed by the body blocks in order
pub fn article(page: &Page) -> impl IntoView + use<> {
    let slug = page.slug().to_string();
    let title = page.title().to_string();
    let author = page.author().to_string();
    let datetime = page.date().format("%Y-%m-%d").to_string();
    let display_date = page.date().format("%B %-d, %Y").to_string();
    let hero = page.hero_image().map(|src| {
        let src = src.to_string();
        view! { <img class="hero" src=src alt=""/> }
    });
    let categories = page
        .categories()
        .iter()
        .map(String::as_str)
        .map(category_link)
        .collect::<Vec<_>>();
    let blocks = page.body().iter().map(block).collect::<Vec<_>>();

    view! {
        <article class="page">
            <header data-slug=slug>
                {hero}
                <h1>{title}</h1>
                <p class="byline">
                    <span class="author">{author}</span>
                    <time datetime=datetime>{display_date}</time>
                </p>
                <ul class="categories">{categories}</ul>
            </header>
            <section class="content">{blocks}</section>
        </article>
    }
}

fn category_link(name: &str) -> impl IntoView + use<> {
    let href = crate::category_url(name);
    let name = name.to_string();
    view! { <li><a href=href>{name}</a></li> }
}

/// One content block
pub fn block(block: &ContentBlock) -> AnyView {
    match block.clone() {
        ContentBlock::Paragraph { text } => view! { <p>{text}</p> }.into_any(),
        ContentBlock::Image { uri, alt } => {
            let caption = alt.clone();
            view! {
                <figure>
                    <img src=uri alt=alt/>
                    <figcaption>{caption}</figcaption>
                </figure>
            }
            .into_any()
        }
        ContentBlock::Link { uri, label } => {
            view! { <p class="link"><a href=uri>{label}</a></p> }.into_any()
        }
        ContentBlock::CodeExample {
            source,
            language: Some(language),
        } => {
            let class = format!("language-{}", language);
            view! { <pre><code class=class>{source}</code></pre> }.into_any()
        }
        ContentBlock::CodeExample {
            source,
            language: None,
        } => view! { <pre><code>{source}</code></pre> }.into_any(),
        ContentBlock::Heading { level, text } => heading(level, text),
        ContentBlock::List { ordered, items } => {
            let items = items
                .into_iter()
                .map(|item| view! { <li>{item}</li> })
                .collect::<Vec<_>>();
            if ordered {
                view! { <ol>{items}</ol> }.into_any()
            } else {
                view! { <ul>{items}</ul> }.into_any()
            }
        }
    }
}

fn heading(level: u8, text: String) -> AnyView {
    match level {
        1 => view! { <h1>{text}</h1> }.into_any(),
        2 => view! { <h2>{text}</h2> }.into_any(),
        3 => view! { <h3>{text}</h3> }.into_any(),
        4 => view! { <h4>{text}</h4> }.into_any(),
        5 => view! { <h5>{text}</h5> }.into_any(),
        _ => view! { <h6>{text}</h6> }.into_any(),
    }
}

/// Entry in a page listing
pub struct ListingEntry {
    pub href: String,
    pub title: String,
    pub date: String,
}

/// A titled list of links to pages
pub fn listing(title: String, entries: Vec<ListingEntry>) -> impl IntoView {
    let items = entries
        .into_iter()
        .map(|entry| {
            let ListingEntry { href, title, date } = entry;
            let datetime = date.clone();
            view! {
                <li>
                    <time datetime=datetime>{date}</time>
                    <a href=href>{title}</a>
                </li>
            }
        })
        .collect::<Vec<_>>();

    view! {
        <section class="listing">
            <h1>{title}</h1>
            <ul>{items}</ul>
        </section>
    }
}

/// Body of the 404 page
pub fn not_found(path: String) -> impl IntoView {
    view! {
        <section class="not-found">
            <h1>"Page not found"</h1>
            <p>{format!("Nothing lives at {}", path)}</p>
        </section>
    }
}

use anyhow::{Context, Result};
use chrono::Local;
use quire_core::config::CONFIG_FILE;
use std::fs;
use std::path::{Path, PathBuf};

const STYLESHEET: &str = r#"body {
    max-width: 42rem;
    margin: 2rem auto;
    padding: 0 1rem;
    font-family: system-ui, sans-serif;
    line-height: 1.6;
}

pre {
    overflow-x: auto;
    padding: 1rem;
    background: #f4f4f4;
}
"#;

/// Escape a string for safe inclusion in a TOML basic string
///
/// Handles the required escape sequences:
/// - Backslash (\\) -> \\\\
/// - Quote (\") -> \\\"
/// - Backspace (\b) -> \\b
/// - Form feed (\f) -> \\f
/// - Newline (\n) -> \\n
/// - Carriage return (\r) -> \\r
/// - Tab (\t) -> \\t
///
/// The generated files carry comments and a fixed layout, which the toml
/// serializer would not preserve.
///
/// See: https://toml.io/en/v1.0.0#string
fn toml_escape_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\x08', "\\b")
        .replace('\x0C', "\\f")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// Derive a site title from its directory name.
///
/// - `jane-notebook` → "Jane Notebook"
/// - `my_site` → "My Site"
fn title_from_dir(path: &Path) -> String {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    let words: Vec<String> = name
        .replace(['_', '-'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
            }
        })
        .collect();

    if words.is_empty() {
        "My Notebook".to_string()
    } else {
        words.join(" ")
    }
}

/// Initialize a new site directory.
///
/// Creates:
/// - `quire.toml` with the site title and author
/// - `content/index.md` (home page with bio), `content/about.md`
/// - `content/posts/hello-world.md`, a sample post with a code example
/// - `static/style.css`
///
/// Refuses to touch a directory that already has a `quire.toml`.
pub async fn run(path: PathBuf, title: Option<String>, author: Option<String>) -> Result<()> {
    println!("Initializing site directory: {}", path.display());

    let config_path = path.join(CONFIG_FILE);
    if config_path.exists() {
        anyhow::bail!(
            "{} already exists at {}\nHint: Delete it first or use a different directory",
            CONFIG_FILE,
            config_path.display()
        );
    }

    let title = title.unwrap_or_else(|| title_from_dir(&path));
    let author = author.unwrap_or_else(|| "Your Name".to_string());

    create_directory_structure(&path)?;
    generate_quire_toml(&path, &title, &author)?;
    generate_sample_content(&path)?;

    println!("\n✓ Initialization complete!");
    println!("\nGenerated structure:");
    println!("  {}/", path.display());
    println!("  ├── quire.toml           ← Site title, author and base URL");
    println!("  ├── content/");
    println!("  │   ├── index.md         ← Home page");
    println!("  │   ├── about.md");
    println!("  │   └── posts/");
    println!("  │       └── hello-world.md");
    println!("  └── static/");
    println!("      └── style.css");

    println!("\nNext steps:");
    println!("  1. Edit quire.toml (set author and base_url)");
    println!("  2. Write pages under content/");
    println!("  3. Preview: quire serve {}", path.display());

    Ok(())
}

fn create_directory_structure(base: &Path) -> Result<()> {
    fs::create_dir_all(base.join("content").join("posts"))
        .context("Failed to create content directory")?;
    fs::create_dir_all(base.join("static")).context("Failed to create static directory")?;
    Ok(())
}

fn generate_quire_toml(base: &Path, title: &str, author: &str) -> Result<()> {
    let content = format!(
        r#"# Site configuration
# Edit the values below, then run: quire serve

[site]
title = "{}"
author = "{}"                  # Default author for every page
base_url = "https://example.org"
# description = "Notes on programming and privacy"
# language = "en"

[build]
content_dir = "content"
static_dir = "static"              # Published under /static/
output_dir = "public"
drafts = false

[serve]
port = 8080
"#,
        toml_escape_string(title),
        toml_escape_string(author)
    );

    fs::write(base.join(CONFIG_FILE), content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE))?;
    Ok(())
}

fn generate_sample_content(base: &Path) -> Result<()> {
    let today = Local::now().format("%Y-%m-%d").to_string();
    let content = base.join("content");

    let index = format!(
        r#"+++
title = "Home"
date = {today}
+++

Hi, I'm the author of this notebook. Replace this paragraph with a short bio.

[Read the posts](/posts/)
"#
    );

    let about = format!(
        r#"+++
title = "About"
date = {today}
categories = ["meta"]
+++

This site is built with quire. Every page is a Markdown file with TOML front matter.
"#
    );

    let post = format!(
        r#"+++
title = "Hello, World"
date = {today}
categories = ["notes"]
draft = true
+++

A first post. Code examples keep their language tag:

```python
print("hello")
```

Remove `draft = true` above to publish it.
"#
    );

    let files = [
        (content.join("index.md"), index),
        (content.join("about.md"), about),
        (content.join("posts").join("hello-world.md"), post),
    ];
    for (path, text) in files {
        if !path.exists() {
            fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
        }
    }

    let stylesheet = base.join("static").join("style.css");
    if !stylesheet.exists() {
        fs::write(&stylesheet, STYLESHEET).context("Failed to write style.css")?;
    }

    Ok(())
}

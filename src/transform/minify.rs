//! Production minification for bundles and pages.
//!
//! Uses oxc for JavaScript and lightningcss for CSS. HTML is minified by
//! collapsing whitespace outside raw-text elements, dropping comments and
//! minifying inline `<style>`/`<script>` bodies.

use std::path::Path;
use std::sync::LazyLock;

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use regex::Regex;

/// Minify JavaScript source code.
pub fn minify_js(source: &str) -> Option<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::mjs()).parse();
    if !ret.errors.is_empty() {
        return None;
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Some(code)
}

/// Minify CSS source code.
pub fn minify_css(source: &str) -> Option<String> {
    let mut stylesheet = StyleSheet::parse(source, ParserOptions::default()).ok()?;
    stylesheet.minify(MinifyOptions::default()).ok()?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .ok()?;
    Some(result.code)
}

/// Elements whose contents are kept apart from whitespace collapsing.
static RAW_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)(?P<keep><pre\b[^>]*>.*?</pre\s*>|<textarea\b[^>]*>.*?</textarea\s*>)|(?P<script_open><script\b[^>]*>)(?P<script>.*?)</script\s*>|(?P<style_open><style\b[^>]*>)(?P<style>.*?)</style\s*>",
    )
    .expect("valid regex")
});

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static BETWEEN_TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s+<").expect("valid regex"));
static TRAILING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s+$").expect("valid regex"));
static LEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s+<").expect("valid regex"));

/// Minify an HTML document.
pub fn minify_html(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut last = 0;

    for caps in RAW_ELEMENT.captures_iter(source) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&collapse(&source[last..whole.start()]));
        last = whole.end();

        if let Some(keep) = caps.name("keep") {
            out.push_str(keep.as_str());
        } else if let (Some(open), Some(body)) = (caps.name("script_open"), caps.name("script")) {
            out.push_str(open.as_str());
            out.push_str(&minify_inline_script(open.as_str(), body.as_str()));
            out.push_str("</script>");
        } else if let (Some(open), Some(body)) = (caps.name("style_open"), caps.name("style")) {
            out.push_str(open.as_str());
            out.push_str(&minify_css(body.as_str()).unwrap_or_else(|| body.as_str().to_string()));
            out.push_str("</style>");
        }
    }
    out.push_str(&collapse(&source[last..]));
    out.trim().to_string()
}

fn minify_inline_script(open_tag: &str, body: &str) -> String {
    let lower = open_tag.to_ascii_lowercase();
    let is_js = !lower.contains("type=")
        || lower.contains("javascript")
        || lower.contains("type=\"module\"")
        || lower.contains("type='module'");
    if !is_js || body.trim().is_empty() {
        return body.to_string();
    }
    minify_js(body).unwrap_or_else(|| body.to_string())
}

/// Collapse whitespace and drop comments in a markup fragment.
/// Conditional comments (`<!--[if IE]>`) are kept.
///
/// Fragments are bounded by raw elements, so whitespace between a tag and
/// the fragment edge sits between two tags.
fn collapse(fragment: &str) -> String {
    let without_comments = COMMENT.replace_all(fragment, |caps: &regex::Captures| {
        let comment = &caps[0];
        if comment.starts_with("<!--[") {
            comment.to_string()
        } else {
            String::new()
        }
    });
    let collapsed = WHITESPACE.replace_all(&without_comments, " ");
    let collapsed = BETWEEN_TAGS.replace_all(&collapsed, "><");
    let collapsed = TRAILING.replace(&collapsed, ">");
    LEADING.replace(&collapsed, "<").into_owned()
}

/// Minify content based on file extension.
///
/// Returns `Some(minified)` if minification succeeded, `None` otherwise.
pub fn minify_by_ext(path: &Path, content: &str) -> Option<String> {
    let ext = path.extension()?.to_str()?;
    match ext {
        "js" => minify_js(content),
        "css" => minify_css(content),
        "html" | "htm" => Some(minify_html(content)),
        _ => None,
    }
}

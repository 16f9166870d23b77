//! HTML for the upload page and its results.

use std::fmt::Write as _;

use satqa_core::AnalysisResult;

use crate::upload::UploadRecord;

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Satellite Image QA</title>
    <style>
        body { font-family: sans-serif; margin: 2em; background-color: #f4f4f9; color: #333; }
        h1, h2 { color: #333; }
        .container { max-width: 900px; margin: auto; background: white; padding: 20px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }
        .upload-form { margin-bottom: 2em; }
        .result { display: flex; align-items: flex-start; margin-bottom: 1.5em; border-bottom: 1px solid #ddd; padding-bottom: 1.5em; }
        .result figure { margin: 0 20px 0 0; }
        .result img { max-width: 250px; max-height: 250px; border-radius: 4px; border: 1px solid #ccc; }
        .result figcaption { font-size: 0.8em; color: #666; word-break: break-all; max-width: 250px; }
        .result pre { background-color: #eee; padding: 15px; border-radius: 4px; white-space: pre-wrap; word-wrap: break-word; flex-grow: 1; font-size: 0.9em; }
        input[type="submit"] { font-size: 1em; padding: 10px 15px; cursor: pointer; background-color: #4285F4; color: white; border: none; border-radius: 4px; }
        input[type="submit"]:hover { background-color: #357ae8; }
    </style>
</head>
<body>
    <div class="container">
        <h1>Satellite Image Quality Assurance</h1>
        <form class="upload-form" action="/upload" method="post" enctype="multipart/form-data">
            <p>Select one or more satellite images to analyze:</p>
            <input type="file" name="files" accept="image/*" multiple required>
            <br><br>
            <input type="submit" value="Run QA">
        </form>
"#;

const PAGE_TAIL: &str = "    </div>
</body>
</html>
";

/// Escapes text for use in element content and quoted attribute values.
#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Two-space indented JSON, as shown next to each image.
#[must_use]
pub fn pretty_analysis(analysis: &AnalysisResult) -> String {
    serde_json::to_string_pretty(analysis)
        .unwrap_or_else(|e| format!("analysis could not be serialized: {e}"))
}

/// The upload form, followed by one result block per record in order.
#[must_use]
pub fn render_page(records: &[UploadRecord]) -> String {
    let mut html = String::from(PAGE_HEAD);

    if !records.is_empty() {
        html.push_str("        <h2>Analysis Results</h2>\n");
        for record in records {
            let _ = write!(
                html,
                r#"        <div class="result">
            <figure>
                <img src="{url}" alt="{name}">
                <figcaption>{name}<br>{gs_uri}</figcaption>
            </figure>
            <pre>{analysis}</pre>
        </div>
"#,
                url = escape_html(&record.public_url),
                name = escape_html(&record.filename),
                gs_uri = escape_html(&record.gs_uri),
                analysis = escape_html(&pretty_analysis(&record.analysis)),
            );
        }
    }

    html.push_str(PAGE_TAIL);
    html
}

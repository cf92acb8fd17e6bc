use std::fmt::Write;

use crate::domain::AccessRecord;
use crate::output::table::{row_values, COLUMNS};

const HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>AWS IAM Identity Center Report</title>
<link rel="stylesheet" href="https://cdn.datatables.net/1.13.6/css/jquery.dataTables.min.css">
<style>
table.dataTable thead th { background-color: #4F81BD; color: white; font-weight: bold; }
table.dataTable tbody tr:nth-child(even) { background-color: #f9f9f9; }
table.dataTable tbody tr:hover { background-color: #e6f3ff; }
.container { margin: 20px; }
h1 { color: #4F81BD; font-family: Arial, sans-serif; }
</style>
</head>
<body>
<div class="container">
<h1>AWS IAM Identity Center Report</h1>
"#;

const TAIL: &str = r#"</div>

<script src="https://code.jquery.com/jquery-3.6.0.min.js"></script>
<script src="https://cdn.datatables.net/1.13.6/js/jquery.dataTables.min.js"></script>
<script>
$(document).ready(function() {
    $('.display').DataTable({
        "pageLength": 25,
        "lengthMenu": [10, 25, 50, 100, -1],
        "order": [[ 0, "asc" ]]
    });
});
</script>
</body>
</html>
"#;

#[must_use]
pub fn format_html(records: &[AccessRecord]) -> String {
    let mut html = String::from(HEAD);
    let _ = writeln!(
        html,
        "<p>Generated on: {}</p>",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    html.push_str("<table class=\"display nowrap\">\n<thead>\n<tr>");
    for title in COLUMNS {
        let _ = write!(html, "<th>{}</th>", escape_cell(title));
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");

    for record in records {
        html.push_str("<tr>");
        for value in row_values(record) {
            let _ = write!(html, "<td>{}</td>", escape_cell(&value));
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</tbody>\n</table>\n");
    html.push_str(TAIL);
    html
}

/// HTML-escape a cell, then render newlines as `<br>`.
fn escape_cell(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
        .replace("\r\n", "<br>")
        .replace('\n', "<br>")
}

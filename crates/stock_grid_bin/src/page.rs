use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use minute_grid::XLSX_MIME;

use crate::utils::escape_html;

pub enum Notice {
    Info(String),
    Success(String),
    Warning(String),
    Error(String),
}

impl Notice {
    fn to_html(&self) -> String {
        match self {
            Notice::Info(msg) => format!(r#"<p class="notice info">{}</p>"#, escape_html(msg)),
            Notice::Success(msg) => {
                format!(r#"<p class="notice success">{}</p>"#, escape_html(msg))
            }
            Notice::Warning(msg) => {
                format!(r#"<p class="notice warning">&#9888;&#65039; {}</p>"#, escape_html(msg))
            }
            Notice::Error(msg) => format!(r#"<p class="notice error">{}</p>"#, escape_html(msg)),
        }
    }
}

/// A ready spreadsheet, embedded in the page as a data URI.
pub struct DownloadLink<'a> {
    pub filename: &'a str,
    pub bytes: &'a [u8],
}

impl DownloadLink<'_> {
    fn to_html(&self) -> String {
        format!(
            r#"<a class="download" download="{}" href="data:{};base64,{}">&#128229; Download Excel File</a>"#,
            escape_html(self.filename),
            XLSX_MIME,
            BASE64.encode(self.bytes)
        )
    }
}

/// The single page: symbol and date inputs, any notices from the last run,
/// and the download link once a file is ready.
pub fn render(
    symbol: &str,
    date: &str,
    notices: &[Notice],
    download: Option<&DownloadLink>,
) -> String {
    let notice_html: String = notices.iter().map(Notice::to_html).collect();
    let download_html = download.map(DownloadLink::to_html).unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Stock Data Downloader</title>
<style>
body {{ font-family: sans-serif; max-width: 40rem; margin: 3rem auto; }}
label, input, button {{ display: block; margin-bottom: 0.75rem; }}
input {{ width: 100%; padding: 0.4rem; }}
.notice {{ padding: 0.6rem; border-radius: 4px; }}
.warning {{ background: #fff4ce; }}
.error {{ background: #fde2e2; }}
.info {{ background: #e2effd; }}
.success {{ background: #e2fde6; }}
</style>
</head>
<body>
<h1>&#128200; Stock Data to Excel Downloader</h1>
{notice}
<form method="get" action="/download">
<label for="symbol">Enter Stock Symbol (e.g. RELIANCE.NS):</label>
<input id="symbol" name="symbol" value="{symbol}">
<label for="date">Enter Date (YYYY-MM-DD):</label>
<input id="date" name="date" value="{date}" placeholder="yesterday">
<button type="submit">&#128229; Download Excel</button>
</form>
{download}
</body>
</html>
"#,
        notice = notice_html,
        download = download_html,
        symbol = escape_html(symbol),
        date = escape_html(date),
    )
}

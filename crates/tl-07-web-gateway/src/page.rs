//! Minimal HTML status page served at `/`.

pub fn render(node_id: &str, layer: &str, routes: usize, height: Option<u64>) -> String {
    let height = height
        .map(|h| h.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Tandem-Ledger node {node_id}</title></head>
<body>
<h1>Tandem-Ledger</h1>
<table>
<tr><td>Node</td><td>{node_id}</td></tr>
<tr><td>Layer</td><td>{layer}</td></tr>
<tr><td>Registered routes</td><td>{routes}</td></tr>
<tr><td>Last block height</td><td>{height}</td></tr>
</table>
<p><a href="/debug">debug</a></p>
</body>
</html>
"#
    )
}

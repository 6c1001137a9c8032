use scraper::{Html, Selector};

/// Cheap sniff: captures are either the text dump of the rendered page or
/// the page markup itself, and the automation layer does not tell us which.
pub fn looks_like_html(content: &str) -> bool {
    let head = content.trim_start();
    head.starts_with('<') || content.contains("</") || content.contains("<br")
}

/// Flatten an HTML capture into the line sequence the positional pipeline
/// expects.
///
/// Rows tagged with the source system's `registro` class are the reliable
/// path: the first cell is the forecast label and the remaining cells are
/// the quantities, so each row becomes a marker line followed by a value
/// line. Markup without that class degrades to one line per text node and
/// the positional heuristics take over.
pub fn flatten(content: &str) -> String {
    let doc = Html::parse_document(content);
    let registro = Selector::parse("tr.registro, span.registro").unwrap();
    let cell = Selector::parse("td, span").unwrap();

    let mut lines: Vec<String> = Vec::new();
    for row in doc.select(&registro) {
        let cells: Vec<String> = row
            .select(&cell)
            .map(|c| collapse(&c.text().collect::<Vec<_>>().join(" ")))
            .filter(|t| !t.is_empty())
            .collect();
        let cells = if cells.is_empty() {
            vec![collapse(&row.text().collect::<Vec<_>>().join(" "))]
        } else {
            cells
        };
        match cells.split_first() {
            Some((label, rest)) if rest.len() >= 3 => {
                lines.push(label.clone());
                lines.push(rest.join(" "));
            }
            _ => lines.push(cells.join(" ")),
        }
    }

    if lines.is_empty() {
        for text in doc.root_element().text() {
            let t = collapse(text);
            if !t.is_empty() {
                lines.push(t);
            }
        }
    }

    lines.join("\n")
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_markup() {
        assert!(looks_like_html("<html><body></body></html>"));
        assert!(looks_like_html("  <table><tr class=\"registro\"></tr></table>"));
        assert!(!looks_like_html("000014 VELUDO CONFORT\nPronta entrega"));
    }

    #[test]
    fn registro_rows_become_marker_and_value_lines() {
        let html = r#"<table>
            <tr class="cabecalho"><td>Previsão</td><td>Estoque</td><td>Pedidos</td><td>Disponível</td></tr>
            <tr class="registro"><td>Pronta entrega</td><td>16.605,30</td><td>16.605,30</td><td>0,00</td></tr>
            <tr class="registro"><td>19/01/2026</td><td>14.766,10</td><td>6.544,70</td><td>8.221,40</td></tr>
        </table>"#;
        let flat = flatten(html);
        let lines: Vec<&str> = flat.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Pronta entrega",
                "16.605,30 16.605,30 0,00",
                "19/01/2026",
                "14.766,10 6.544,70 8.221,40",
            ]
        );
    }

    #[test]
    fn markup_without_registro_degrades_to_text_nodes() {
        let html = "<div><p>000014 VELUDO CONFORT 001 TINTO</p><p>Pronta entrega</p><p>16.605,30 16.605,30 0,00</p></div>";
        let flat = flatten(html);
        assert_eq!(
            flat.lines().collect::<Vec<_>>(),
            vec![
                "000014 VELUDO CONFORT 001 TINTO",
                "Pronta entrega",
                "16.605,30 16.605,30 0,00",
            ]
        );
    }
}

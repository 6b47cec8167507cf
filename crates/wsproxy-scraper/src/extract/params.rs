//! Technical parameters (name/value pairs).

use crate::markup;
use crate::types::Param;

/// Cells longer than this are prose, not a parameter.
const MAX_CELL_CHARS: usize = 80;

/// One way a site lays out its parameters. Tried in the order given.
#[derive(Debug, Clone, Copy)]
pub enum ParamLayout {
    /// Repeating elements sharing one class: name, value, name, value, ...
    Pairs { class: &'static str },
    /// Label elements each followed by a value element.
    LabelValue {
        labels: &'static [&'static str],
        value: &'static str,
    },
    /// `<tr>` rows of the first table inside `container`.
    Table { container: &'static str },
    /// Any `<tr>` on the page with at least two cells.
    AnyTable,
}

/// Returns the pairs of the first layout that yields any.
#[must_use]
pub fn extract_params(html: &str, layouts: &[ParamLayout]) -> Vec<Param> {
    layouts
        .iter()
        .map(|layout| match *layout {
            ParamLayout::Pairs { class } => pairs(html, class),
            ParamLayout::LabelValue { labels, value } => label_value(html, labels, value),
            ParamLayout::Table { container } => markup::first_with_class(html, container)
                .map(table_rows)
                .unwrap_or_default(),
            ParamLayout::AnyTable => table_rows(html),
        })
        .find(|params| !params.is_empty())
        .unwrap_or_default()
}

fn pairs(html: &str, class: &str) -> Vec<Param> {
    let texts: Vec<String> = markup::all_with_class(html, class)
        .into_iter()
        .map(markup::text_of)
        .collect();
    texts
        .chunks_exact(2)
        .filter_map(|pair| {
            let name = pair[0].trim_end_matches(':').trim();
            let value = pair[1].trim();
            param(name, value)
        })
        .collect()
}

fn label_value(html: &str, labels: &[&str], value_class: &str) -> Vec<Param> {
    let mut params = Vec::new();
    let mut pending_label: Option<String> = None;
    for tag in markup::tags(html).filter(|t| !t.closing) {
        if labels.iter().any(|l| tag.class_contains(l)) {
            pending_label = Some(markup::text_of(markup::element(html, &tag)));
        } else if tag.class_contains(value_class) {
            if let Some(label) = pending_label.take() {
                let value = markup::text_of(markup::element(html, &tag));
                params.extend(param(label.trim_end_matches(':').trim(), &value));
            }
        }
    }
    params
}

fn table_rows(html: &str) -> Vec<Param> {
    markup::all_named(html, "tr")
        .into_iter()
        .filter_map(|row| {
            let cells: Vec<String> = markup::tags(row)
                .filter(|t| !t.closing && (t.name == "td" || t.name == "th"))
                .map(|t| markup::text_of(markup::element(row, &t)))
                .collect();
            match cells.as_slice() {
                [name, value, ..] => param(name.trim_end_matches(':').trim(), value),
                _ => None,
            }
        })
        .collect()
}

fn param(name: &str, value: &str) -> Option<Param> {
    let ok = |s: &str| !s.is_empty() && s.chars().count() < MAX_CELL_CHARS;
    (ok(name) && ok(value)).then(|| Param {
        name: name.to_owned(),
        value: value.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(name: &str, value: &str) -> Param {
        Param {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn pairs_strip_trailing_colon() {
        let html = r#"<div class="spec__text">Masa:</div><div class="spec__text">90 kg</div>
            <div class="spec__text">Moc:</div><div class="spec__text">4 kW</div><div class="spec__text">sierota</div>"#;
        assert_eq!(
            extract_params(html, &[ParamLayout::Pairs { class: "spec__text" }]),
            vec![p("Masa", "90 kg"), p("Moc", "4 kW")]
        );
    }

    #[test]
    fn label_value_pairs_each_label_with_next_value() {
        let html = r#"<li><span class="c-product-spec__label">Wysokość robocza</span>
            <span class="c-product-spec__value">12 m</span></li>
            <li><span class="c-product-spec__name">Udźwig</span><span class="c-product-spec__value">230 kg</span></li>"#;
        let layouts = [ParamLayout::LabelValue {
            labels: &["c-product-spec__label", "c-product-spec__name"],
            value: "c-product-spec__value",
        }];
        assert_eq!(
            extract_params(html, &layouts),
            vec![p("Wysokość robocza", "12 m"), p("Udźwig", "230 kg")]
        );
    }

    #[test]
    fn falls_through_to_tables() {
        let html = r"<table><tbody><tr><th>Zasilanie</th><td>230 V</td></tr>
            <tr><td>jedna komórka</td></tr></tbody></table>";
        let layouts = [
            ParamLayout::Pairs { class: "missing" },
            ParamLayout::Table {
                container: "c-equipment-specification-table",
            },
            ParamLayout::AnyTable,
        ];
        assert_eq!(extract_params(html, &layouts), vec![p("Zasilanie", "230 V")]);
    }

    #[test]
    fn long_cells_are_not_parameters() {
        let long = "x".repeat(MAX_CELL_CHARS);
        let html = format!("<tr><td>Opis</td><td>{long}</td></tr>");
        assert!(extract_params(&html, &[ParamLayout::AnyTable]).is_empty());
    }
}

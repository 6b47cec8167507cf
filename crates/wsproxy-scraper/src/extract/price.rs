//! Price parsing for Polish storefront markup (`150,00 zł`, `netto/ DOBA`).

use std::sync::LazyLock;

use regex::Regex;

use crate::markup;

static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("valid regex"));

static NET_INLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d\s]*(?:[.,]\d+)?)\s*zł\s*netto").expect("valid regex")
});

static GROSS_INLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d\s]*(?:[.,]\d+)?)\s*zł\s*brutto").expect("valid regex")
});

static LEADING_NET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^netto\s*/?\s*").expect("valid regex"));

/// Unit assumed when a rental price names none.
pub const DEFAULT_UNIT: &str = "DOBA";

/// First numeric run of `text`, with whitespace (thousands separators) removed
/// and a decimal comma read as a point.
#[must_use]
pub fn parse_amount(text: &str) -> Option<f64> {
    let compact: String = markup::decode_entities(text)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    AMOUNT_RE
        .find(&compact)
        .and_then(|m| m.as_str().replace(',', ".").parse().ok())
}

/// Normalizes a unit label: `netto/&nbsp;DOBA` becomes `DOBA`.
#[must_use]
pub fn normalize_unit(raw: &str) -> Option<String> {
    let text = markup::collapse_whitespace(&markup::decode_entities(raw));
    let unit = LEADING_NET_RE.replace(&text, "");
    let unit = unit.trim().trim_start_matches('/').trim();
    (!unit.is_empty()).then(|| unit.to_owned())
}

/// Net amount from free text such as `150,00 zł netto`.
#[must_use]
pub fn inline_net(text: &str) -> Option<f64> {
    inline(&NET_INLINE_RE, text)
}

/// Gross amount from free text such as `184,50 zł brutto`.
#[must_use]
pub fn inline_gross(text: &str) -> Option<f64> {
    inline(&GROSS_INLINE_RE, text)
}

fn inline(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| parse_amount(m.as_str()))
}

/// Formats an amount the way the storefront prints it: `150,00 zł netto`.
#[must_use]
pub fn format_net(amount: f64) -> String {
    format!("{amount:.2} zł netto").replacen('.', ",", 1)
}

/// Class fingerprints of one independent price block.
#[derive(Debug, Clone, Copy)]
pub struct PriceBlock {
    pub block: &'static str,
    pub amount: &'static str,
    pub unit: Option<&'static str>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockPrice {
    pub amount: Option<f64>,
    pub unit: Option<String>,
}

/// Reads one price block. A missing block or element yields `None` fields.
#[must_use]
pub fn read_block(html: &str, classes: &PriceBlock) -> BlockPrice {
    let Some(block) = markup::first_with_class(html, classes.block) else {
        return BlockPrice::default();
    };
    let amount = markup::text_of_class(block, classes.amount).and_then(|t| parse_amount(&t));
    let unit = classes
        .unit
        .and_then(|class| markup::text_of_class(block, class))
        .and_then(|t| normalize_unit(&t));
    BlockPrice { amount, unit }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_amount_handles_decimal_comma_and_spaces() {
        assert_eq!(parse_amount("150,00 zł"), Some(150.0));
        assert_eq!(parse_amount("1 234,50&nbsp;zł"), Some(1234.5));
        assert_eq!(parse_amount("12.5"), Some(12.5));
        assert_eq!(parse_amount("Zapytaj o cenę"), None);
    }

    #[test]
    fn normalize_unit_strips_netto_prefix() {
        assert_eq!(normalize_unit("netto/&nbsp;DOBA").as_deref(), Some("DOBA"));
        assert_eq!(normalize_unit(" / tydzień ").as_deref(), Some("tydzień"));
        assert_eq!(normalize_unit("netto"), None);
    }

    #[test]
    fn inline_prices_are_qualified() {
        let text = "Młot 150,00 zł netto 184,50 zł brutto";
        assert_eq!(inline_net(text), Some(150.0));
        assert_eq!(inline_gross(text), Some(184.5));
        assert_eq!(inline_net("99 zł"), None);
    }

    #[test]
    fn format_net_uses_polish_decimal_comma() {
        assert_eq!(format_net(150.0), "150,00 zł netto");
        assert_eq!(format_net(1234.5), "1234,50 zł netto");
    }

    #[test]
    fn read_block_finds_amount_and_unit() {
        let html = r#"<div class="rental rental--net"><span class="rental__price">150,00 zł</span><span class="rental__type">netto/&nbsp;DOBA</span></div>"#;
        let classes = PriceBlock {
            block: "rental--net",
            amount: "rental__price",
            unit: Some("rental__type"),
        };
        assert_eq!(
            read_block(html, &classes),
            BlockPrice {
                amount: Some(150.0),
                unit: Some("DOBA".to_string()),
            }
        );
        let missing = PriceBlock {
            block: "rental--gross",
            ..classes
        };
        assert_eq!(read_block(html, &missing), BlockPrice::default());
    }
}

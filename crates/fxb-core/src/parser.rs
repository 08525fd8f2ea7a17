//! Free-text request parsing: `10 USD RUB` or `10 долларов в рубли`.

use crate::{
    catalog::Catalog,
    domain::{ConversionRequest, CurrencyCode},
    errors::ParseError,
};

/// Words accepted as the optional third token of the 4-token form.
pub const IN_MARKERS: &[&str] = &["в", "in", "to"];

#[derive(Clone, Debug, PartialEq)]
pub struct ParsedRequest {
    pub amount: f64,
    pub source: String,
    pub target: String,
}

#[derive(Clone, Copy, Debug)]
struct Tokens<'a> {
    amount: &'a str,
    source: &'a str,
    target: &'a str,
}

fn split(raw: &str) -> Result<Tokens<'_>, ParseError> {
    let parts: Vec<&str> = raw.split_whitespace().collect();
    let tokens = match *parts.as_slice() {
        [amount, source, target] => Tokens {
            amount,
            source,
            target,
        },
        [amount, source, marker, target] if is_in_marker(marker) => Tokens {
            amount,
            source,
            target,
        },
        _ => return Err(ParseError::BadShape { tokens: parts.len() }),
    };

    if tokens.source == tokens.target {
        return Err(ParseError::SameCurrency {
            currency: tokens.target.to_string(),
        });
    }

    Ok(tokens)
}

fn is_in_marker(token: &str) -> bool {
    let lower = token.to_lowercase();
    IN_MARKERS.iter().any(|m| *m == lower)
}

/// Parse a finite, positive amount. Both `.` and `,` work as decimal separator.
fn parse_amount(token: &str) -> Option<f64> {
    let v = token.replace(',', ".").parse::<f64>().ok()?;
    (v.is_finite() && v > 0.0).then_some(v)
}

/// Split a message into amount + raw currency tokens, without touching the catalog.
pub fn parse(raw: &str) -> Result<ParsedRequest, ParseError> {
    let t = split(raw)?;
    let amount = parse_amount(t.amount).ok_or_else(|| ParseError::BadAmount {
        token: t.amount.to_string(),
        currency: t.source.to_string(),
    })?;

    Ok(ParsedRequest {
        amount,
        source: t.source.to_string(),
        target: t.target.to_string(),
    })
}

/// Full input pipeline: [`parse`], then currency resolution.
///
/// Currency errors take precedence over a bad amount, and a bad amount is
/// reported with the canonical source code.
pub fn parse_request(raw: &str, catalog: &Catalog) -> Result<ConversionRequest, ParseError> {
    match parse(raw) {
        Ok(parsed) => parsed.resolve(catalog),
        Err(ParseError::BadAmount { token, .. }) => {
            let t = split(raw)?;
            let (from, _) = resolve_pair(catalog, t.source, t.target)?;
            Err(ParseError::BadAmount {
                token,
                currency: from.to_string(),
            })
        }
        Err(e) => Err(e),
    }
}

fn resolve_pair(
    catalog: &Catalog,
    source: &str,
    target: &str,
) -> Result<(CurrencyCode, CurrencyCode), ParseError> {
    let from = catalog.resolve(source)?;
    let to = catalog.resolve(target)?;
    if from == to {
        return Err(ParseError::SameCurrency {
            currency: to.to_string(),
        });
    }
    Ok((from, to))
}

impl ParsedRequest {
    /// Resolve the raw tokens of an already-parsed request.
    pub fn resolve(&self, catalog: &Catalog) -> Result<ConversionRequest, ParseError> {
        let (from, to) = resolve_pair(catalog, &self.source, &self.target)?;
        Ok(ConversionRequest {
            amount: self.amount,
            from,
            to,
        })
    }
}

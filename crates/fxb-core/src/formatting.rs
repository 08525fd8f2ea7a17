//! Reply rendering (Telegram HTML).

use crate::{
    catalog::Catalog,
    domain::ConversionResult,
    errors::{ConvertError, ParseError},
};

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Cut `html` to at most `limit` characters, keeping whole lines only.
///
/// Every reply line carries balanced tags and complete entities, so a line
/// boundary is always a valid cut point. Empty when not even the first line fits.
pub fn clip_lines(html: &str, limit: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for line in html.split_inclusive('\n') {
        let n = line.chars().count();
        if used + n > limit {
            break;
        }
        out.push_str(line);
        used += n;
    }
    out
}

pub const GENERIC_FAILURE: &str = "Что-то пошло не так, попробуйте позже :-(";

const USAGE: &str = "Укажите три значения через пробел так:\n\
<i>количество исходная_валюта итоговая_валюта</i>\n\
или так:\n\
<i>количество исходная_валюта <b>в</b> итоговая_валюта</i>";

pub fn help_html() -> String {
    "Я умею конвертировать валюты.\n\n\
Просто напишите\n\
<i>сколько_конвертируем из_какой_валюты в_какую_валюту</i>.\n\n\
Например,\n\
<i>10 доллар рубль</i> сконвертирует 10 долларов в рубли.\n\n\
Можно писать так:\n\
<i>10 USD RUB</i>\n\
…и так:\n\
<i>10 доллар RUB</i>, <i>10 USD рубли</i>\n\
…и даже так:\n\
<i>10 долларов в рубли</i>\n\
Команды:\n\
/values — список доступных валют."
        .to_string()
}

pub fn currencies_html(catalog: &Catalog) -> String {
    let lines: String = catalog
        .entries()
        .iter()
        .map(|d| {
            format!(
                "- {}, {}: {}\n",
                escape_html(&d.short),
                escape_html(&d.code),
                escape_html(&d.name)
            )
        })
        .collect();
    format!("Доступные валюты:\n{lines}")
}

pub fn result_html(r: &ConversionResult) -> String {
    format!(
        "{} {} это <b>{}</b> {}",
        r.amount, r.from, r.converted, r.to
    )
}

pub fn parse_error_html(e: &ParseError) -> String {
    match e {
        ParseError::BadShape { .. } => USAGE.to_string(),
        ParseError::SameCurrency { currency } => {
            format!("Конвертация в {} не требуется.", escape_html(currency))
        }
        ParseError::BadAmount { token, currency } => format!(
            "Не могу сконвертировать {} {}",
            escape_html(token),
            escape_html(currency)
        ),
        ParseError::UnknownCurrency { token } => {
            format!("Валюта \"{}\" не поддерживается.", escape_html(token))
        }
    }
}

/// User-facing text for a failed conversion. `None` means stay silent.
///
/// Rate source failures always get the generic apology; internal detail is only
/// appended in diagnostic mode. Cache faults are shown in diagnostic mode only.
pub fn convert_error_html(e: &ConvertError, diagnostic: bool) -> Option<String> {
    match e {
        ConvertError::Api(api) if diagnostic => Some(format!(
            "{GENERIC_FAILURE}\n{}",
            escape_html(&api.to_string())
        )),
        ConvertError::Api(_) => Some(GENERIC_FAILURE.to_string()),
        ConvertError::Cache(cache) if diagnostic => Some(format!(
            "Проблема при работе с кэшем: {}",
            escape_html(&cache.to_string())
        )),
        ConvertError::Cache(_) => None,
    }
}

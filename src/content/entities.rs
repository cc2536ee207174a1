/// Resolve an HTML character reference by name (`amp`, `nbsp`, `#39`, `#x2014`).
///
/// Returns `None` for names the table does not know; callers keep the
/// reference text as-is in that case, the way a browser does.
pub(crate) fn decode_html_entity(name: &str) -> Option<char> {
    if name.starts_with('#') {
        return decode_numeric_entity(name);
    }

    let decoded = match name.to_ascii_lowercase().as_str() {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" | "ensp" | "emsp" | "thinsp" => ' ',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201C}',
        "rdquo" => '\u{201D}',
        "laquo" => '«',
        "raquo" => '»',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "hellip" => '\u{2026}',
        "bull" | "middot" => '·',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "deg" => '°',
        "euro" => '€',
        "pound" => '£',
        "times" => '×',
        "divide" => '÷',
        "rarr" => '→',
        "larr" => '←',
        "aacute" => 'á',
        "eacute" => 'é',
        "iacute" => 'í',
        "oacute" => 'ó',
        "uacute" => 'ú',
        "agrave" => 'à',
        "egrave" => 'è',
        "igrave" => 'ì',
        "ograve" => 'ò',
        "ugrave" => 'ù',
        "auml" => 'ä',
        "euml" => 'ë',
        "ouml" => 'ö',
        "uuml" => 'ü',
        "ntilde" => 'ñ',
        "ccedil" => 'ç',
        "szlig" => 'ß',
        "iexcl" => '¡',
        "iquest" => '¿',
        _ => return None,
    };

    // Entity names are case-sensitive for accented capitals (`&Eacute;`).
    if name.chars().next().is_some_and(|c| c.is_ascii_uppercase()) && decoded.is_alphabetic() {
        return decoded.to_uppercase().next();
    }
    Some(decoded)
}

fn decode_numeric_entity(name: &str) -> Option<char> {
    let digits = name.strip_prefix('#')?;
    let value = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u32>().ok()?,
    };

    match value {
        // Non-breaking space reads as a plain word separator.
        0xA0 => Some(' '),
        _ => char::from_u32(value),
    }
}

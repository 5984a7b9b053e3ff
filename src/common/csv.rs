// src/common/csv.rs

use std::borrow::Cow;

// Escapa um campo conforme a RFC 4180: aspas duplicadas e o campo entre aspas
// sempre que contiver separador, aspas ou quebra de linha.
pub fn escape_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Monta um documento CSV a partir do cabeçalho e das linhas já convertidas em texto.
/// Cada registro termina em `\n`.
pub fn write_document<I>(header: &[&str], rows: I) -> String
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut out = header.join(",");
    out.push('\n');

    for row in rows {
        let line: Vec<Cow<'_, str>> = row.iter().map(|field| escape_field(field)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }

    out
}

use pulldown_cmark::CodeBlockKind;

pub(super) fn language_hint(kind: &CodeBlockKind<'_>) -> String {
    match kind {
        CodeBlockKind::Indented => String::new(),
        CodeBlockKind::Fenced(info) => info.split_ascii_whitespace().next().unwrap_or("").into(),
    }
}

pub(super) fn detab(s: &str) -> String {
    s.replace('\t', "    ")
}

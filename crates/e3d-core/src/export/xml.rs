//! Text helpers shared by the scene-graph writers

pub fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Node name usable as a VRML/X3D `DEF` identifier.
///
/// Identifiers may not start with a digit or sign.
pub fn node_name(name: &str) -> String {
    let clean = sanitize_filename(name);
    match clean.chars().next() {
        Some(c) if c.is_ascii_digit() || c == '-' => format!("_{clean}"),
        None => "_".to_string(),
        _ => clean,
    }
}

/// Space separated `x y z` triples
pub(crate) fn points_list(points: &[[f32; 3]], separator: &str) -> String {
    points
        .iter()
        .map(|p| format!("{} {} {}", p[0], p[1], p[2]))
        .collect::<Vec<_>>()
        .join(separator)
}

/// Triangle index list with `-1` face terminators
pub(crate) fn face_index_list(indices: &[u32], separator: &str) -> String {
    indices
        .chunks_exact(3)
        .map(|t| format!("{} {} {} -1", t[0], t[1], t[2]))
        .collect::<Vec<_>>()
        .join(separator)
}

pub(crate) fn rgb(c: [f32; 3]) -> String {
    format!("{} {} {}", c[0], c[1], c[2])
}

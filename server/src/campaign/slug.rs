use rand::prelude::*;

const BASE36: &[char] = &[
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h',
    'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// URL id for a room name: "Summer  Drop!" becomes "summer-drop".
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.trim().to_lowercase().chars() {
        if c.is_whitespace() || c == '-' {
            pending_dash = true;
        } else if c.is_ascii_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        }
    }

    slug
}

pub fn random_slug() -> String {
    let mut rng = StdRng::from_entropy();
    (0..8).map(|_| BASE36[rng.gen_range(0..BASE36.len())]).collect()
}

/// The slug for `title`, or a random id when nothing usable is left of it.
pub fn campaign_id(title: &str) -> String {
    match slugify(title) {
        slug if slug.is_empty() => random_slug(),
        slug => slug,
    }
}

// Colour distribution for the default social card
//
// Letters of the title get pastel colours ordered so that neighbours differ
// as much as possible, with a little noise so every render looks different.

use rand::seq::SliceRandom;
use rand::Rng;

pub const PASTELS: [&str; 21] = [
    "#FFB8E0", "#FFC6E9", "#FFD0F0", "#E0B8FF", "#EBC9FF", "#F0D4FF", "#C9EEFF", "#B8FFE8",
    "#C5FFE6", "#B8FFD0", "#CCFFD9", "#FFE8A0", "#FFF0B8", "#FFD6B8", "#FFE4CC", "#FFD0E3",
    "#FFE2EC", "#E0EBB8", "#E8FFB8", "#B8EBDA", "#CFFFF1",
];

pub const CARD_TITLE: &str = "EventAbility";
pub const CARD_WIDTH: u32 = 1200;
pub const CARD_HEIGHT: u32 = 900;

/// Upper bound of the random bonus added to each candidate's distance
pub const TIE_BREAK_RANGE: f64 = 20.0;

fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Euclidean distance between two `#RRGGBB` colours in RGB space.
/// Unparseable colours are treated as black.
pub fn color_distance(a: &str, b: &str) -> f64 {
    let (r1, g1, b1) = parse_hex(a).unwrap_or_default();
    let (r2, g2, b2) = parse_hex(b).unwrap_or_default();
    let dr = f64::from(r1) - f64::from(r2);
    let dg = f64::from(g1) - f64::from(g2);
    let db = f64::from(b1) - f64::from(b2);
    (dr * dr + dg * dg + db * db).sqrt()
}

/// Order `colors` so adjacent entries are far apart.
///
/// Shuffles to pick a random first colour, then greedily appends the
/// remaining colour with the largest distance to the last one, each distance
/// nudged by a random amount in `[0, TIE_BREAK_RANGE)`.
pub fn distribute_colors<R: Rng + ?Sized>(colors: &[&str], rng: &mut R) -> Vec<String> {
    let mut remaining: Vec<&str> = colors.to_vec();
    remaining.shuffle(rng);
    if remaining.is_empty() {
        return Vec::new();
    }

    let mut result = vec![remaining.remove(0).to_string()];
    while !remaining.is_empty() {
        let last = result.last().map(String::as_str).unwrap_or_default();
        let mut best_score = f64::MIN;
        let mut best_index = 0;
        for (index, color) in remaining.iter().enumerate() {
            let score = color_distance(last, color) + rng.gen::<f64>() * TIE_BREAK_RANGE;
            if score > best_score {
                best_score = score;
                best_index = index;
            }
        }
        result.push(remaining.remove(best_index).to_string());
    }
    result
}

/// One colour per character of `text`, cycling through the distribution.
pub fn letter_colors<R: Rng + ?Sized>(text: &str, rng: &mut R) -> Vec<(char, String)> {
    let distributed = distribute_colors(&PASTELS, rng);
    text.chars()
        .enumerate()
        .map(|(i, c)| (c, distributed[i % distributed.len()].clone()))
        .collect()
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render the default social card as an SVG document.
pub fn render_card_svg<R: Rng + ?Sized>(rng: &mut R) -> String {
    let letters = letter_colors(CARD_TITLE, rng);
    let spans: String = letters
        .iter()
        .map(|(c, color)| {
            format!(
                r#"<tspan fill="{color}">{}</tspan>"#,
                escape_xml(&c.to_string())
            )
        })
        .collect();

    let taglines = [
        (420, 48, "Let's be friends!"),
        (490, 48, "Join our welcoming community."),
        (570, 24, "Find friends who understand your journey"),
        (610, 24, "and share your interests"),
        (650, 24, "through accessible,"),
        (690, 24, "inclusive events."),
    ];
    let tagline_text: String = taglines
        .iter()
        .map(|(y, size, line)| {
            format!(
                r##"<text x="600" y="{y}" text-anchor="middle" font-family="Poppins" font-weight="bold" font-size="{size}" fill="#000000">{}</text>"##,
                escape_xml(line)
            )
        })
        .collect();

    format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            r##"<rect width="100%" height="100%" fill="#B8E8FF"/>"##,
            r##"<rect x="39" y="139" width="1122" height="622" rx="12" fill="#000000"/>"##,
            r##"<rect x="32" y="132" width="1122" height="622" rx="12" fill="#FFE2EC" stroke="#000000" stroke-width="3"/>"##,
            r##"<text x="600" y="320" text-anchor="middle" font-family="Righteous" font-weight="bold" font-size="96" stroke="#000000" stroke-width="4" paint-order="stroke">{spans}</text>"##,
            "{taglines}",
            "</svg>"
        ),
        w = CARD_WIDTH,
        h = CARD_HEIGHT,
        spans = spans,
        taglines = tagline_text,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_color_distance() {
        assert_eq!(color_distance("#000000", "#000000"), 0.0);
        assert_eq!(color_distance("#FF0000", "#000000"), 255.0);
        let d = color_distance("#FFFFFF", "#000000");
        assert!((d - (3.0f64 * 255.0 * 255.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_distribution_is_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut result = distribute_colors(&PASTELS, &mut rng);
        assert_eq!(result.len(), PASTELS.len());
        result.sort();
        let mut expected: Vec<String> = PASTELS.iter().map(|c| c.to_string()).collect();
        expected.sort();
        assert_eq!(result, expected);
    }

    #[test]
    fn test_each_step_is_near_the_furthest_choice() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let result = distribute_colors(&PASTELS, &mut rng);
            for i in 1..result.len() {
                let chosen = color_distance(&result[i - 1], &result[i]);
                let best_remaining = result[i..]
                    .iter()
                    .map(|c| color_distance(&result[i - 1], c))
                    .fold(f64::MIN, f64::max);
                assert!(best_remaining - chosen < TIE_BREAK_RANGE);
            }
        }
    }

    #[test]
    fn test_empty_palette() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(distribute_colors(&[], &mut rng).is_empty());
    }

    #[test]
    fn test_letter_colors_cover_title() {
        let mut rng = StdRng::seed_from_u64(3);
        let letters = letter_colors(CARD_TITLE, &mut rng);
        assert_eq!(letters.len(), CARD_TITLE.len());
        assert_eq!(letters[0].0, 'E');
        assert!(letters.iter().all(|(_, c)| PASTELS.contains(&c.as_str())));
    }

    #[test]
    fn test_render_card_svg() {
        let mut rng = StdRng::seed_from_u64(3);
        let svg = render_card_svg(&mut rng);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<tspan").count(), CARD_TITLE.len());
        assert!(svg.contains("Let's be friends!"));
    }
}

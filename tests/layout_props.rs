//! Property-based tests for the text layout search.

use living_clock::config::LayoutConfig;
use living_clock::layout::{layout, wrap, Region};
use proptest::prelude::*;

/// Proportional-ish measurer: narrow and wide glyphs differ.
fn measure(text: &str, size: u32) -> u32 {
    text.chars()
        .map(|c| match c {
            'i' | 'l' | '.' | ',' | ' ' => size * 3 / 10,
            'm' | 'w' | 'M' | 'W' => size * 9 / 10,
            _ => size * 55 / 100,
        })
        .sum()
}

fn words() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-zA-Z,.]{1,14}", 0..30).prop_map(|w| w.join(" "))
}

fn region() -> impl Strategy<Value = Region> {
    (0i32..400, 0i32..300, 40u32..960, 40u32..540).prop_map(|(x, y, width, height)| Region {
        x,
        y,
        width,
        height,
    })
}

proptest! {
    /// Never more than `max_lines`; every line fits unless it is a single glyph.
    #[test]
    fn lines_respect_count_and_width(text in words(), region in region()) {
        let config = LayoutConfig::poem();
        let result = layout(&text, region, &config, &measure);

        prop_assert!(result.lines.len() <= config.max_lines);
        for line in &result.lines {
            let width = measure(&line.text, result.font_size);
            prop_assert_eq!(width, line.width);
            prop_assert!(
                width <= result.usable_width || line.text.chars().count() == 1,
                "{:?} is {} wide, usable {}", line.text, width, result.usable_width
            );
        }
    }

    /// Identical inputs give identical output.
    #[test]
    fn layout_is_idempotent(text in words(), region in region()) {
        let config = LayoutConfig::note();
        prop_assert_eq!(
            layout(&text, region, &config, &measure),
            layout(&text, region, &config, &measure)
        );
    }

    /// A fitting result is the largest size whose wrapped block fits.
    #[test]
    fn chosen_size_is_the_largest_that_fits(text in words(), region in region()) {
        let config = LayoutConfig::poem();
        let result = layout(&text, region, &config, &measure);
        let block = |size: u32| {
            let lines = wrap(&text, result.usable_width, size, config.max_lines, &measure);
            lines.len() as f32 * size as f32 * config.line_height
        };

        if result.fits {
            prop_assert!(block(result.font_size) <= result.usable_height as f32);
            for larger in config.sizes().filter(|s| *s > result.font_size) {
                prop_assert!(block(larger) > result.usable_height as f32);
            }
        } else {
            prop_assert_eq!(result.font_size, config.min_font_size);
        }
    }

    /// Wrapping only drops whitespace, up to the line cap.
    #[test]
    fn wrap_preserves_words(text in words(), width in 20u32..600) {
        let lines = wrap(&text, width, 20, usize::MAX, &measure);
        let rejoined: String = lines.concat().split_whitespace().collect();
        let original: String = text.split_whitespace().collect();
        prop_assert_eq!(rejoined, original);
    }
}

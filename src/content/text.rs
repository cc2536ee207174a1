//! Word-level text helpers shared by the parser and the presentation shells.

/// Characters that make a token read slower.
pub const PAUSE_PUNCTUATION: &[char] = &[',', '.', ';', ':', '!', '?'];

/// Join consecutive words into groups of `chunk_size` words.
pub fn group_words<'a, I>(words: I, chunk_size: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let chunk_size = chunk_size.max(1);
    let mut groups = Vec::new();
    let mut current = String::new();
    let mut in_group = 0usize;

    for word in words.into_iter().filter(|word| !word.is_empty()) {
        if in_group > 0 {
            current.push(' ');
        }
        current.push_str(word);
        in_group += 1;

        if in_group == chunk_size {
            groups.push(std::mem::take(&mut current));
            in_group = 0;
        }
    }

    if in_group > 0 {
        groups.push(current);
    }

    groups
}

pub fn has_pause_punctuation(token: &str) -> bool {
    token.contains(PAUSE_PUNCTUATION)
}

/// Index (in chars) of the letter the eye should fixate on.
pub fn orp_index(word: &str) -> usize {
    match word.chars().count() {
        0 | 1 => 0,
        2..=4 => 1,
        5..=9 => 2,
        10..=13 => 3,
        len => len / 4,
    }
}

/// Split a word into the text before, at, and after its recognition point.
pub fn split_at_orp(word: &str) -> (&str, &str, &str) {
    let orp = orp_index(word);
    let mut boundaries = word.char_indices().map(|(at, _)| at).skip(orp);

    let Some(start) = boundaries.next() else {
        return (word, "", "");
    };
    let end = boundaries.next().unwrap_or(word.len());

    (&word[..start], &word[start..end], &word[end..])
}

pub fn estimate_reading_minutes(word_count: usize, words_per_minute: u32) -> f64 {
    word_count as f64 / f64::from(words_per_minute.max(1))
}

/// Whole minutes needed to read `word_count` words, never less than one.
pub fn reading_time_minutes(word_count: usize, words_per_minute: u32) -> u64 {
    if word_count == 0 {
        return 1;
    }
    (estimate_reading_minutes(word_count, words_per_minute).ceil() as u64).max(1)
}

pub fn format_reading_time(minutes: f64) -> String {
    let minutes = minutes.max(0.0);
    let mut mins = minutes.floor() as u64;
    let mut secs = ((minutes - minutes.floor()) * 60.0).round() as u64;
    if secs == 60 {
        mins += 1;
        secs = 0;
    }

    match (mins, secs) {
        (0, secs) => format!("{secs} sec"),
        (mins, 0) => format!("{mins} min"),
        (mins, secs) => format!("{mins} min {secs} sec"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_words_by_chunk_size() {
        let words = "one two three four five".split_whitespace();
        assert_eq!(
            group_words(words, 2),
            vec!["one two", "three four", "five"]
        );
        assert_eq!(group_words("a b".split_whitespace(), 0), vec!["a", "b"]);
    }

    #[test]
    fn orp_tracks_word_length() {
        assert_eq!(orp_index("a"), 0);
        assert_eq!(orp_index("word"), 1);
        assert_eq!(orp_index("reading"), 2);
        assert_eq!(orp_index("comprehension"), 3);
        assert_eq!(orp_index("internationalization"), 5);
    }

    #[test]
    fn splits_on_char_boundaries() {
        assert_eq!(split_at_orp("hello"), ("he", "l", "lo"));
        assert_eq!(split_at_orp("é"), ("", "é", ""));
        assert_eq!(split_at_orp("naïve"), ("na", "ï", "ve"));
        assert_eq!(split_at_orp(""), ("", "", ""));
    }

    #[test]
    fn formats_reading_time() {
        assert_eq!(format_reading_time(0.75), "45 sec");
        assert_eq!(format_reading_time(3.0), "3 min");
        assert_eq!(format_reading_time(3.0 + 1.0 / 3.0), "3 min 20 sec");
        assert_eq!(format_reading_time(1.999), "2 min");
    }

    #[test]
    fn reading_time_rounds_up_with_a_floor_of_one() {
        assert_eq!(reading_time_minutes(0, 200), 1);
        assert_eq!(reading_time_minutes(50, 200), 1);
        assert_eq!(reading_time_minutes(450, 200), 3);
    }

    #[test]
    fn detects_pause_punctuation() {
        assert!(has_pause_punctuation("world."));
        assert!(has_pause_punctuation("however,"));
        assert!(!has_pause_punctuation("plain"));
    }
}

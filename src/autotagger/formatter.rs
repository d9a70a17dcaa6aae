use crate::models::CaseConvention;

/// Highest code point treated as Latin script (end of Latin Extended-B).
const LATIN_MAX: u32 = 0x024F;

/// Converts raw tag suggestions into a configured case convention.
///
/// Tags written only in Latin script get a full word split and case
/// conversion. Anything else only has its inner whitespace replaced, since
/// case mapping rules built for ASCII mangle many other scripts.
pub struct TagFormatter;

impl TagFormatter {
    /// Formats a single tag. Never fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use autotag::autotagger::TagFormatter;
    /// use autotag::CaseConvention;
    ///
    /// assert_eq!(
    ///     TagFormatter::format("Healthy and Tasty", CaseConvention::KebabCase),
    ///     "healthy-and-tasty"
    /// );
    /// assert_eq!(
    ///     TagFormatter::format("Healthy and Tasty", CaseConvention::ConstantCase),
    ///     "HEALTHY_AND_TASTY"
    /// );
    /// assert_eq!(
    ///     TagFormatter::format("健康 美味", CaseConvention::KebabCase),
    ///     "健康-美味"
    /// );
    /// ```
    #[must_use]
    pub fn format(tag: &str, convention: CaseConvention) -> String {
        if is_latin(tag) {
            convert_latin(tag, convention)
        } else {
            convert_fallback(tag, convention)
        }
    }

    /// Formats a batch of tags, dropping blank ones and applying an optional
    /// namespace prefix such as `autotag/`.
    ///
    /// Order is preserved and duplicates are kept.
    #[must_use]
    pub fn format_all(
        tags: &[String],
        convention: CaseConvention,
        prefix: Option<&str>,
    ) -> Vec<String> {
        tags.iter()
            .filter(|tag| !tag.trim().is_empty())
            .map(|tag| Self::format(tag, convention))
            .filter(|tag| !tag.is_empty())
            .map(|tag| match prefix {
                Some(prefix) => format!("{prefix}{tag}"),
                None => tag,
            })
            .collect()
    }
}

fn is_latin(tag: &str) -> bool {
    tag.chars().all(|c| c as u32 <= LATIN_MAX)
}

fn convert_fallback(tag: &str, convention: CaseConvention) -> String {
    let separator = match convention {
        CaseConvention::KebabCase | CaseConvention::TrainCase => "-",
        CaseConvention::SnakeCase | CaseConvention::PascalSnakeCase => "_",
        CaseConvention::PascalCase | CaseConvention::CamelCase | CaseConvention::ConstantCase => {
            return tag.to_string();
        }
    };

    tag.split_whitespace().collect::<Vec<_>>().join(separator)
}

fn convert_latin(tag: &str, convention: CaseConvention) -> String {
    let words = split_words(tag);

    match convention {
        CaseConvention::KebabCase => join_mapped(&words, "-", str::to_lowercase),
        CaseConvention::SnakeCase => join_mapped(&words, "_", str::to_lowercase),
        CaseConvention::ConstantCase => join_mapped(&words, "_", str::to_uppercase),
        CaseConvention::PascalCase => join_mapped(&words, "", capitalize),
        CaseConvention::PascalSnakeCase => join_mapped(&words, "_", capitalize),
        CaseConvention::TrainCase => join_mapped(&words, "-", capitalize),
        CaseConvention::CamelCase => words
            .iter()
            .enumerate()
            .map(|(i, word)| {
                if i == 0 {
                    word.to_lowercase()
                } else {
                    capitalize(word)
                }
            })
            .collect(),
    }
}

fn join_mapped(words: &[String], separator: &str, map: impl Fn(&str) -> String) -> String {
    words
        .iter()
        .map(|word| map(word.as_str()))
        .collect::<Vec<_>>()
        .join(separator)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Splits a tag into words on non-alphanumeric characters and on case
/// boundaries (`camelCase` → `camel`, `Case`; `XMLHttp` → `XML`, `Http`).
fn split_words(tag: &str) -> Vec<String> {
    let chars: Vec<char> = tag.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if let Some(&prev) = i.checked_sub(1).and_then(|p| chars.get(p))
            && !current.is_empty()
        {
            let next = chars.get(i + 1).copied();
            let lower_to_upper = prev.is_lowercase() && c.is_uppercase();
            let acronym_end =
                prev.is_uppercase() && c.is_uppercase() && next.is_some_and(char::is_lowercase);

            if lower_to_upper || acronym_end {
                words.push(std::mem::take(&mut current));
            }
        }

        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }

    words
}

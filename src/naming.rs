//! Identifier normalization for generated code.
//!
//! Arbitrary human text (operation summaries, folder names, header names)
//! is turned into a space-separated word list by [`normalize`], then into
//! camelCase variable names or StudlyCase class names. [`NameCache`] memoizes
//! the results for one generation run so a raw string always maps to the same
//! identifier.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// PHP keywords and type names that cannot be used as class names.
pub static RESERVED_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "abstract",
        "and",
        "array",
        "as",
        "bool",
        "break",
        "callable",
        "case",
        "catch",
        "class",
        "clone",
        "const",
        "continue",
        "declare",
        "default",
        "die",
        "do",
        "echo",
        "else",
        "elseif",
        "empty",
        "enddeclare",
        "endfor",
        "endforeach",
        "endif",
        "endswitch",
        "endwhile",
        "enum",
        "eval",
        "exit",
        "extends",
        "false",
        "final",
        "finally",
        "float",
        "fn",
        "for",
        "foreach",
        "function",
        "global",
        "goto",
        "if",
        "implements",
        "include",
        "instanceof",
        "insteadof",
        "int",
        "interface",
        "isset",
        "iterable",
        "list",
        "match",
        "mixed",
        "namespace",
        "never",
        "new",
        "null",
        "object",
        "or",
        "parent",
        "print",
        "private",
        "protected",
        "public",
        "readonly",
        "require",
        "return",
        "self",
        "static",
        "string",
        "switch",
        "throw",
        "trait",
        "true",
        "try",
        "unset",
        "use",
        "var",
        "void",
        "while",
        "xor",
        "yield",
    ]
    .into_iter()
    .collect()
});

/// Connective words dropped when they sit between two other words.
const FILLER_WORDS: &[&str] = &["a", "an"];

/// Normalize free text into space-separated ASCII words.
///
/// Splits camelCase boundaries, folds accented letters to ASCII, drops
/// possessive `'s` and interior connectives ("a", "an"), treats every
/// non-alphanumeric character as a separator and strips leading digits.
/// The result is a fixed point: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let folded = fold_to_ascii(text);
    let without_possessive = strip_possessive(&folded);

    let spaced: String = without_possessive
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();

    let words: Vec<&str> = spaced
        .split_whitespace()
        .flat_map(split_camel_case)
        .collect();

    let last = words.len().saturating_sub(1);
    let kept: Vec<&str> = words
        .into_iter()
        .enumerate()
        .filter(|(i, w)| *i == 0 || *i == last || !FILLER_WORDS.contains(w))
        .map(|(_, w)| w)
        .collect();

    let joined = kept.join(" ");
    joined
        .trim_start_matches(|c: char| c.is_ascii_digit() || c == ' ')
        .to_string()
}

/// Convert text to a lower camelCase identifier.
pub fn camel_case(text: &str) -> String {
    let normalized = normalize(text);
    let mut result = String::new();
    for (i, word) in normalized.split(' ').filter(|w| !w.is_empty()).enumerate() {
        if i == 0 {
            result.push_str(&word.to_ascii_lowercase());
        } else {
            result.push_str(&capitalize_first(word));
        }
    }
    result
}

/// Convert text to an upper StudlyCase identifier.
pub fn studly_case(text: &str) -> String {
    normalize(text)
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(capitalize_first)
        .collect()
}

/// Capitalize the first letter of a string.
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

/// Whether `name` is a reserved word (case-insensitive).
pub fn is_reserved(name: &str) -> bool {
    RESERVED_WORDS.contains(name.to_ascii_lowercase().as_str())
}

/// Whether a raw name or value is a type annotation such as `<string>` or
/// `<integer,null>` rather than literal data.
pub fn is_type_annotation(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.len() > 2 && trimmed.starts_with('<') && trimmed.ends_with('>')
}

/// Naive English singularization used for derived item type names.
pub fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies")
        && !stem.is_empty()
    {
        return format!("{stem}y");
    }
    if word.ends_with("sses") || word.ends_with("xes") {
        return word[..word.len() - 2].to_string();
    }
    if word.ends_with('s') && !word.ends_with("ss") && word.len() > 1 {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

/// Splits a word into its camelCase parts.
///
/// - "getUser" -> ["get", "User"]
/// - "HTTPClient" -> ["HTTP", "Client"]
/// - "v2Users" -> ["v2", "Users"]
fn split_camel_case(s: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut word_start = 0;
    let chars: Vec<(usize, char)> = s.char_indices().collect();

    for i in 1..chars.len() {
        let (idx, current) = chars[i];
        let prev = chars[i - 1].1;

        let is_new_word = current.is_ascii_uppercase()
            && (prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase()
                    && chars
                        .get(i + 1)
                        .is_some_and(|(_, next)| next.is_ascii_lowercase())));

        if is_new_word {
            words.push(&s[word_start..idx]);
            word_start = idx;
        }
    }
    if word_start < s.len() {
        words.push(&s[word_start..]);
    }
    words
}

/// Remove possessive `'s` / `’s` endings so "user's name" reads "user name".
fn strip_possessive(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let is_apostrophe = c == '\'' || c == '\u{2019}';
        if is_apostrophe
            && chars.get(i + 1).is_some_and(|n| *n == 's' || *n == 'S')
            && chars.get(i + 2).is_none_or(|n| !n.is_ascii_alphanumeric())
        {
            i += 2;
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}

/// Fold accented Latin letters to ASCII; other non-ASCII characters become
/// separators.
fn fold_to_ascii(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii() {
            out.push(c);
            continue;
        }
        let folded = match c {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
            'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ă' | 'Ą' => "A",
            'æ' => "ae",
            'Æ' => "AE",
            'ç' | 'ć' | 'č' | 'ĉ' | 'ċ' => "c",
            'Ç' | 'Ć' | 'Č' | 'Ĉ' | 'Ċ' => "C",
            'ď' | 'đ' | 'ð' => "d",
            'Ď' | 'Đ' | 'Ð' => "D",
            'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => "e",
            'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ė' | 'Ę' | 'Ě' => "E",
            'ğ' | 'ģ' | 'ĝ' => "g",
            'Ğ' | 'Ģ' | 'Ĝ' => "G",
            'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' | 'ı' => "i",
            'Ì' | 'Í' | 'Î' | 'Ï' | 'Ī' | 'Į' | 'İ' => "I",
            'ķ' => "k",
            'Ķ' => "K",
            'ł' | 'ľ' | 'ļ' | 'ĺ' => "l",
            'Ł' | 'Ľ' | 'Ļ' | 'Ĺ' => "L",
            'ñ' | 'ń' | 'ň' | 'ņ' => "n",
            'Ñ' | 'Ń' | 'Ň' | 'Ņ' => "N",
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
            'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'Ō' | 'Ő' => "O",
            'œ' => "oe",
            'Œ' => "OE",
            'ŕ' | 'ř' => "r",
            'Ŕ' | 'Ř' => "R",
            'ś' | 'š' | 'ş' | 'ș' => "s",
            'Ś' | 'Š' | 'Ş' | 'Ș' => "S",
            'ß' => "ss",
            'ť' | 'ţ' | 'ț' => "t",
            'Ť' | 'Ţ' | 'Ț' => "T",
            'þ' => "th",
            'Þ' => "TH",
            'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' | 'ų' => "u",
            'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ū' | 'Ů' | 'Ű' | 'Ų' => "U",
            'ý' | 'ÿ' => "y",
            'Ý' | 'Ÿ' => "Y",
            'ž' | 'ź' | 'ż' => "z",
            'Ž' | 'Ź' | 'Ż' => "Z",
            '\u{2019}' => "'",
            _ => " ",
        };
        out.push_str(folded);
    }
    out
}

/// Per-run memo of name translations.
///
/// Keyed by the raw input string so repeated lookups are stable and cheap.
/// Construct one per generation run; never share across runs.
#[derive(Debug, Default)]
pub struct NameCache {
    normalized: HashMap<String, String>,
    variables: HashMap<String, String>,
    classes: HashMap<(String, String), String>,
}

impl NameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached [`normalize`].
    pub fn normalize(&mut self, text: &str) -> String {
        if let Some(hit) = self.normalized.get(text) {
            return hit.clone();
        }
        let value = normalize(text);
        self.normalized.insert(text.to_string(), value.clone());
        value
    }

    /// camelCase variable/method name. Empty results fall back to `value`.
    pub fn to_variable_name(&mut self, text: &str) -> String {
        if let Some(hit) = self.variables.get(text) {
            return hit.clone();
        }
        let mut value = camel_case(text);
        if value.is_empty() {
            value = "value".to_string();
        }
        self.variables.insert(text.to_string(), value.clone());
        value
    }

    /// StudlyCase class name; reserved words get `collision_suffix` appended.
    pub fn to_class_name(&mut self, text: &str, collision_suffix: &str) -> String {
        let key = (text.to_string(), collision_suffix.to_string());
        if let Some(hit) = self.classes.get(&key) {
            return hit.clone();
        }
        let mut value = studly_case(text);
        if value.is_empty() {
            value = "Unnamed".to_string();
        }
        if is_reserved(&value) {
            value.push_str(collision_suffix);
        }
        self.classes.insert(key, value.clone());
        value
    }

    /// Credential parameter name for an API-key header such as `X-Api-Key`.
    pub fn credential_name(&mut self, key_name: &str) -> String {
        let stripped = key_name
            .strip_prefix("X-")
            .or_else(|| key_name.strip_prefix("x-"))
            .unwrap_or(key_name);
        self.to_variable_name(stripped)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_splits_and_cleans() {
        assert_eq!(normalize("getUserById"), "get User By Id");
        assert_eq!(normalize("HTTPClient"), "HTTP Client");
        assert_eq!(normalize("list_users-v2"), "list users v2");
        assert_eq!(normalize("Create a new (draft) post"), "Create new draft post");
        assert_eq!(normalize("Get the user's profile"), "Get the user profile");
        assert_eq!(normalize("123 go"), "go");
        assert_eq!(normalize("  spaced   out  "), "spaced out");
        assert_eq!(normalize("Crème brûlée"), "Creme brulee");
        assert_eq!(normalize("a thing"), "a thing");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "getUserById",
            "HTTPClient",
            "Create a an a new thing",
            "12 34 users",
            "Möbius/strip: v2.1 (beta)",
            "user's X-Api-Key",
            "",
            "___",
            "ÆON flux",
            "déjà vu",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_variable_names() {
        let mut names = NameCache::new();
        assert_eq!(names.to_variable_name("user_id"), "userId");
        assert_eq!(names.to_variable_name("Get User"), "getUser");
        assert_eq!(names.to_variable_name("HTTP Client"), "httpClient");
        assert_eq!(names.to_variable_name("channel-id"), "channelId");
        assert_eq!(names.to_variable_name("!!!"), "value");
    }

    #[test]
    fn test_class_names_avoid_reserved_words() {
        let mut names = NameCache::new();
        assert_eq!(names.to_class_name("user profile", "Dto"), "UserProfile");
        assert_eq!(names.to_class_name("list", "Resource"), "ListResource");
        assert_eq!(names.to_class_name("class", "Dto"), "ClassDto");
        assert_eq!(names.to_class_name("Object", "Request"), "ObjectRequest");
        assert_eq!(names.to_class_name("", "Dto"), "Unnamed");
    }

    #[test]
    fn test_cache_is_stable() {
        let mut names = NameCache::new();
        let first = names.to_variable_name("list all users");
        let second = names.to_variable_name("list all users");
        assert_eq!(first, second);
        assert_eq!(names.normalize("fooBar"), names.normalize("fooBar"));
    }

    #[test]
    fn test_class_name_round_trips_through_studly() {
        assert_eq!(studly_case("CreateUserRequest"), "CreateUserRequest");
        assert_eq!(studly_case(&studly_case("user_profile")), "UserProfile");
    }

    #[test]
    fn test_credential_name_strips_x_prefix() {
        let mut names = NameCache::new();
        assert_eq!(names.credential_name("X-Api-Key"), "apiKey");
        assert_eq!(names.credential_name("api_token"), "apiToken");
    }

    #[test]
    fn test_type_annotation_detection() {
        assert!(is_type_annotation("<string>"));
        assert!(is_type_annotation("<integer,null>"));
        assert!(!is_type_annotation("<>"));
        assert!(!is_type_annotation("plain"));
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("children"), "children");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("items"), "item");
        assert_eq!(singularize("addresses"), "address");
        assert_eq!(singularize("class"), "class");
    }
}

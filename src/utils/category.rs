pub const DEFAULT_CATEGORY: &str = "Övrigt";

/// Ordered category table; the first category with a matching term wins.
const CATEGORIES: &[(&str, &[&str])] = &[
    ("Medlemskap & Avgifter", &["medlem", "avgift", "kostnad"]),
    ("Bokningar & Starttider", &["boka", "starttid", "tee time"]),
    ("Banor & Anläggning", &["bana", "course", "green"]),
    ("Tävlingar & Events", &["tävling", "turnering", "competition"]),
    ("Träning & Lektioner", &["lektion", "träning", "pro"]),
    ("Restaurang & Service", &["restaurang", "mat", "café"]),
    ("Golfshop & Utrustning", &["shop", "butik", "utrustning"]),
    ("Juniorverksamhet", &["junior", "ungdom", "barn"]),
    ("Öppettider & Kontakt", &["öppet", "tid", "kontakt"]),
];

/// Assigns a question to a category by case-insensitive substring match.
pub fn categorize(question: &str) -> &'static str {
    let lower = question.to_lowercase();

    CATEGORIES
        .iter()
        .find(|(_, terms)| terms.iter().any(|term| lower.contains(term)))
        .map(|(category, _)| *category)
        .unwrap_or(DEFAULT_CATEGORY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_by_keyword() {
        assert_eq!(categorize("Vad kostar ett MEDLEMSKAP?"), "Medlemskap & Avgifter");
        assert_eq!(categorize("Kan jag boka en tee time?"), "Bokningar & Starttider");
        assert_eq!(categorize("Hur är greenerna just nu?"), "Banor & Anläggning");
        assert_eq!(categorize("Finns det juniorläger?"), "Juniorverksamhet");
    }

    #[test]
    fn test_first_match_wins() {
        // "starttid" also contains "tid", but bookings come first
        assert_eq!(categorize("Vilken starttid har jag?"), "Bokningar & Starttider");
        // membership outranks restaurant
        assert_eq!(categorize("Ingår mat i medlemsavgiften?"), "Medlemskap & Avgifter");
    }

    #[test]
    fn test_default_category() {
        assert_eq!(categorize("Hej!"), DEFAULT_CATEGORY);
        assert_eq!(categorize(""), DEFAULT_CATEGORY);
    }
}

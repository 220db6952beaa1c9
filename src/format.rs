//! Display helpers for Brazilian phone numbers, currency and dates.

use chrono::{Datelike, NaiveDate, Weekday};

pub fn phone_digits(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Formats a phone number as `(DD) NNNNN-NNNN` (11 digits) or
/// `(DD) NNNN-NNNN` (10 digits). Shorter inputs come back unchanged.
pub fn format_phone(input: &str) -> String {
    let digits = phone_digits(input);
    if digits.len() < 10 {
        return input.to_string();
    }

    let ddd = &digits[..2];
    if digits.len() >= 11 {
        format!("({ddd}) {}-{}", &digits[2..7], &digits[7..11])
    } else {
        format!("({ddd}) {}-{}", &digits[2..6], &digits[6..10])
    }
}

/// `1234.5` -> `R$ 1.234,50`
pub fn format_brl(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let units = (cents / 100).to_string();
    let mut grouped = String::new();
    for (i, ch) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}R$ {grouped},{:02}", cents % 100)
}

pub fn weekday_short(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sun => "Dom",
        Weekday::Mon => "Seg",
        Weekday::Tue => "Ter",
        Weekday::Wed => "Qua",
        Weekday::Thu => "Qui",
        Weekday::Fri => "Sex",
        Weekday::Sat => "Sáb",
    }
}

const MONTHS: [&str; 12] = [
    "janeiro", "fevereiro", "março", "abril", "maio", "junho", "julho", "agosto", "setembro",
    "outubro", "novembro", "dezembro",
];

/// `2026-10-19` -> `Seg, 19/10/2026`
pub fn format_date(date: NaiveDate) -> String {
    format!("{}, {}", weekday_short(date.weekday()), date.format("%d/%m/%Y"))
}

/// `2026-10-01` -> `outubro de 2026`
pub fn format_month(date: NaiveDate) -> String {
    format!("{} de {}", MONTHS[date.month0() as usize], date.year())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_phone_numbers() {
        assert_eq!(format_phone("11987654321"), "(11) 98765-4321");
        assert_eq!(format_phone("(11) 3456-7890"), "(11) 3456-7890");
        assert_eq!(format_phone("1134567890"), "(11) 3456-7890");
        assert_eq!(format_phone("12345"), "12345");
        assert_eq!(format_phone(""), "");
    }

    #[test]
    fn formats_currency() {
        assert_eq!(format_brl(35.0), "R$ 35,00");
        assert_eq!(format_brl(0.5), "R$ 0,50");
        assert_eq!(format_brl(1234.5), "R$ 1.234,50");
        assert_eq!(format_brl(1234567.891), "R$ 1.234.567,89");
    }

    #[test]
    fn formats_dates() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(format_date(date), "Seg, 19/10/2026");
        assert_eq!(format_month(date), "outubro de 2026");
    }
}

//! Barbershop profile and weekly opening hours.

use crate::{
    error::AppError,
    format::{format_phone, phone_digits},
    models::{parse_hhmm, weekday_label, BarbershopProfile, DaySchedule, WorkingHours},
    store::{Saved, Storage},
};

fn validate_day(label: &str, day: &DaySchedule) -> Result<(), AppError> {
    if !day.enabled {
        return Ok(());
    }
    let invalid = |message: &str| AppError::validation(format!("{label}: {message}"));

    let open = parse_hhmm(&day.open_time).ok_or_else(|| invalid("horário de abertura inválido."))?;
    let close =
        parse_hhmm(&day.close_time).ok_or_else(|| invalid("horário de fechamento inválido."))?;
    if open >= close {
        return Err(invalid("a abertura deve ser antes do fechamento."));
    }

    let has_break = !day.break_start.trim().is_empty() || !day.break_end.trim().is_empty();
    if has_break {
        let (Some(start), Some(end)) = (parse_hhmm(&day.break_start), parse_hhmm(&day.break_end))
        else {
            return Err(invalid("intervalo inválido."));
        };
        if !(open <= start && start < end && end <= close) {
            return Err(invalid("o intervalo deve ficar dentro do expediente."));
        }
    }
    Ok(())
}

/// Every enabled day must open before it closes, and a break, when set,
/// has to fit inside the working window.
pub fn validate_hours(hours: &WorkingHours) -> Result<(), AppError> {
    for weekday in WorkingHours::WEEK {
        validate_day(weekday_label(weekday), hours.day(weekday))?;
    }
    Ok(())
}

pub async fn save_hours(storage: &Storage, hours: WorkingHours) -> Result<WorkingHours, AppError> {
    validate_hours(&hours)?;
    storage.put_document(&hours).await?;
    log::info!("Working hours updated");
    Ok(hours)
}

pub async fn save_profile(
    storage: &Storage,
    mut profile: BarbershopProfile,
) -> Result<(BarbershopProfile, Saved), AppError> {
    profile.name = profile.name.trim().to_string();
    if profile.name.is_empty() {
        return Err(AppError::validation("Informe o nome da barbearia."));
    }
    if phone_digits(&profile.whatsapp).len() >= 10 {
        profile.whatsapp = format_phone(&profile.whatsapp);
    }
    let saved = storage.put_document(&profile).await?;
    if let Some(warning) = saved.warning() {
        log::warn!("{warning}");
    }
    log::info!("Profile updated for {}", profile.name);
    Ok((profile, saved))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Weekday;

    use super::*;
    use crate::store::MemoryStore;

    fn day(open: &str, close: &str, start: &str, end: &str) -> DaySchedule {
        DaySchedule {
            enabled: true,
            open_time: open.into(),
            close_time: close.into(),
            break_start: start.into(),
            break_end: end.into(),
        }
    }

    #[test]
    fn default_hours_are_valid() {
        assert!(validate_hours(&WorkingHours::default()).is_ok());
    }

    #[test]
    fn rejects_inverted_days_and_stray_breaks() {
        let cases = [
            day("18:00", "08:00", "", ""),
            day("08:00", "18:00", "07:00", "09:00"),
            day("08:00", "18:00", "13:00", "12:00"),
            day("08:00", "18:00", "17:00", "19:00"),
            day("08:00", "18:00", "12:00", ""),
            day("8h", "18:00", "", ""),
        ];
        for case in cases {
            let mut hours = WorkingHours::default();
            *hours.day_mut(Weekday::Tue) = case.clone();
            let err = validate_hours(&hours).unwrap_err();
            assert!(err.to_string().starts_with("Terça-feira"), "{case:?}: {err}");
        }
    }

    #[test]
    fn disabled_days_are_not_checked() {
        let mut hours = WorkingHours::default();
        *hours.day_mut(Weekday::Sun) = DaySchedule {
            enabled: false,
            ..day("18:00", "08:00", "x", "y")
        };
        assert!(validate_hours(&hours).is_ok());
        // Breaks that touch the edges of the day are fine.
        hours.monday = day("08:00", "18:00", "08:00", "18:00");
        assert!(validate_hours(&hours).is_ok());
    }

    #[actix_web::test]
    async fn profile_whatsapp_is_formatted() {
        let storage = Storage::new(Arc::new(MemoryStore::default()));
        let profile = BarbershopProfile {
            whatsapp: "11987654321".into(),
            ..BarbershopProfile::default()
        };
        let (saved, _) = save_profile(&storage, profile).await.unwrap();
        assert_eq!(saved.whatsapp, "(11) 98765-4321");

        let short = BarbershopProfile {
            whatsapp: "98765".into(),
            ..BarbershopProfile::default()
        };
        let (saved, _) = save_profile(&storage, short).await.unwrap();
        assert_eq!(saved.whatsapp, "98765");
        let stored: BarbershopProfile = storage.document().await.unwrap();
        assert_eq!(stored, saved);
    }
}

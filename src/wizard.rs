//! The five-step client booking flow and the booking it produces.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    format::{format_phone, phone_digits},
    models::{format_hhmm, Booking, BookingStatus, Professional, Service, WorkingHours},
    schedule,
    store::Storage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum WizardStep {
    #[default]
    Professional,
    Service,
    DateTime,
    ClientInfo,
    Review,
}

impl WizardStep {
    pub const ALL: [WizardStep; 5] = [
        WizardStep::Professional,
        WizardStep::Service,
        WizardStep::DateTime,
        WizardStep::ClientInfo,
        WizardStep::Review,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Out-of-range indices clamp to the last step.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    pub fn label(self) -> &'static str {
        match self {
            WizardStep::Professional => "Profissional",
            WizardStep::Service => "Serviço",
            WizardStep::DateTime => "Data e horário",
            WizardStep::ClientInfo => "Seu nome",
            WizardStep::Review => "Revisar",
        }
    }

    /// Whether `selection` holds everything this step asks for.
    pub fn is_satisfied(self, selection: &Selection) -> bool {
        match self {
            WizardStep::Professional => filled(&selection.professional_id),
            WizardStep::Service => filled(&selection.service_id),
            WizardStep::DateTime => selection.date.is_some() && selection.time.is_some(),
            WizardStep::ClientInfo => {
                is_valid_full_name(&selection.full_name) && is_valid_phone(&selection.phone)
            }
            WizardStep::Review => true,
        }
    }
}

fn filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|value| !value.trim().is_empty())
}

fn is_name_letter(ch: char) -> bool {
    ch.is_ascii_alphabetic() || (('\u{C0}'..='\u{FF}').contains(&ch) && ch != '×' && ch != '÷')
}

/// At least two whitespace-separated words made only of Latin letters,
/// accented ones included.
pub fn is_valid_full_name(name: &str) -> bool {
    let mut words = 0;
    for word in name.split_whitespace() {
        if !word.chars().all(is_name_letter) {
            return false;
        }
        words += 1;
    }
    words >= 2
}

/// 10 or 11 digits once punctuation is stripped.
pub fn is_valid_phone(phone: &str) -> bool {
    matches!(phone_digits(phone).len(), 10 | 11)
}

/// Choices accumulated across the steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub professional_id: Option<String>,
    pub service_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub full_name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingWizard {
    step: WizardStep,
    selection: Selection,
}

impl BookingWizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resume(step: WizardStep, selection: Selection) -> Self {
        Self { step, selection }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn can_advance(&self) -> bool {
        self.step.is_satisfied(&self.selection)
    }

    /// Moves one step forward when the current step is satisfied.
    pub fn advance(&mut self) -> bool {
        if !self.can_advance() || self.step == WizardStep::Review {
            return false;
        }
        self.step = WizardStep::from_index(self.step.index() + 1);
        true
    }

    pub fn back(&mut self) {
        self.step = WizardStep::from_index(self.step.index().saturating_sub(1));
    }

    pub fn select_professional(&mut self, id: impl Into<String>) {
        self.selection.professional_id = Some(id.into());
    }

    pub fn select_service(&mut self, id: impl Into<String>) {
        self.selection.service_id = Some(id.into());
    }

    /// A different date invalidates the chosen time.
    pub fn set_date(&mut self, date: NaiveDate) {
        if self.selection.date != Some(date) {
            self.selection.time = None;
        }
        self.selection.date = Some(date);
    }

    pub fn set_time(&mut self, time: NaiveTime) {
        self.selection.time = Some(time);
    }

    pub fn set_client(&mut self, full_name: &str, phone: &str) {
        self.selection.full_name = full_name.trim().to_string();
        self.selection.phone = phone.trim().to_string();
    }

    /// The first step whose requirements are not met, if any.
    pub fn first_incomplete(&self) -> Option<WizardStep> {
        WizardStep::ALL
            .into_iter()
            .find(|step| !step.is_satisfied(&self.selection))
    }

    pub fn is_ready(&self) -> bool {
        self.step == WizardStep::Review && self.first_incomplete().is_none()
    }
}

/// `agd_YYYYMMDD_NNN`, numbered after the bookings already on that date.
/// Skips forward past ids still taken, e.g. after a deletion.
pub fn next_booking_id(date: NaiveDate, existing: &[Booking]) -> String {
    let stamp = date.format("%Y%m%d");
    let mut sequence = existing.iter().filter(|booking| booking.date == date).count() + 1;
    loop {
        let id = format!("agd_{stamp}_{sequence:03}");
        if !existing.iter().any(|booking| booking.id == id) {
            return id;
        }
        sequence += 1;
    }
}

/// Turns a finished wizard into a scheduled booking at the front of the
/// stored list. The whole check-then-write runs in one storage session.
pub async fn confirm(
    storage: &Storage,
    wizard: &BookingWizard,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    if let Some(step) = wizard.first_incomplete() {
        return Err(AppError::validation(format!("Complete a etapa \"{}\".", step.label())));
    }
    let selection = wizard.selection();
    let (Some(professional_id), Some(service_id), Some(date), Some(time)) = (
        selection.professional_id.as_deref(),
        selection.service_id.as_deref(),
        selection.date,
        selection.time,
    ) else {
        return Err(AppError::validation("Seleção incompleta."));
    };

    let session = storage.session().await;
    let professionals: Vec<Professional> = session.list().await?;
    let professional = professionals
        .into_iter()
        .find(|professional| professional.id == professional_id)
        .ok_or(AppError::NotFound("professional"))?;
    let services: Vec<Service> = session.list().await?;
    let service = services
        .iter()
        .find(|service| service.id == service_id)
        .cloned()
        .ok_or(AppError::NotFound("service"))?;
    let hours: WorkingHours = session.document().await?;
    let mut bookings: Vec<Booking> = session.list().await?;

    let open = schedule::available_slots(&hours, &bookings, &services, date, service.duration, now);
    if !open.contains(&time) {
        return Err(AppError::SlotUnavailable {
            date,
            time: format_hhmm(time),
        });
    }

    let booking = Booking {
        id: next_booking_id(date, &bookings),
        client_name: selection.full_name.clone(),
        client_phone: format_phone(&selection.phone),
        professional_id: professional.id,
        professional_name: professional.name,
        service_id: service.id,
        service_name: service.name,
        date,
        time,
        price: service.price,
        status: BookingStatus::Scheduled,
        created_at: Some(Utc::now().to_rfc3339()),
    };
    bookings.insert(0, booking.clone());
    session.replace(&bookings).await?;

    log::info!("Booking {} created for {} at {}", booking.id, booking.date, format_hhmm(booking.time));
    Ok(booking)
}

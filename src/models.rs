use std::fmt;

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::store::{keys, Document, Record};

pub const ROLE_ADMIN: &str = "admin";

pub const DEFAULT_SPECIALTY: &str = "Barbeiro";
pub const DEFAULT_SERVICE_IMAGE: &str = "/assets/images/services/servico-cabelo-preto.jpg";
pub const DEFAULT_PROFESSIONAL_IMAGE: &str = "/assets/images/professionals/pablo.jpg";

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub role: String,
    pub password_hash: String,
    pub active: i64,
    pub created_at: String,
}

/// Parses a `HH:MM` wall-clock time.
pub fn parse_hhmm(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").ok()
}

pub fn format_hhmm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_hhmm(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_hhmm(&raw).ok_or_else(|| de::Error::custom(format!("invalid time `{raw}`")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 3] = [
        BookingStatus::Scheduled,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Scheduled => "scheduled",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }

    pub fn label(self) -> &'static str {
        match self {
            BookingStatus::Scheduled => "Agendado",
            BookingStatus::Completed => "Concluído",
            BookingStatus::Cancelled => "Cancelado",
        }
    }

    /// Only scheduled bookings move, and only to one of the two terminal states.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Scheduled, BookingStatus::Cancelled)
                | (BookingStatus::Scheduled, BookingStatus::Completed)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub client_name: String,
    pub client_phone: String,
    #[serde(default)]
    pub professional_id: String,
    pub professional_name: String,
    #[serde(default)]
    pub service_id: String,
    pub service_name: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub price: f64,
    pub status: BookingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Record for Booking {
    const KEY: &'static str = keys::BOOKINGS;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub duration: u32,
    #[serde(default)]
    pub image: String,
}

impl Record for Service {
    const KEY: &'static str = keys::SERVICES;

    fn id(&self) -> &str {
        &self.id
    }

    fn seed() -> Vec<Self> {
        let service = |id: &str, name: &str, price: f64, duration: u32, image: &str| Service {
            id: id.to_string(),
            name: name.to_string(),
            price,
            duration,
            image: format!("/assets/images/services/{image}"),
        };
        vec![
            service("svc_cut", "Corte de cabelo", 35.0, 45, "servico-cabelo-preto.jpg"),
            service("svc_barbe", "Barba/Acabamento", 25.0, 30, "servico-barba-preto.jpg"),
            service("svc_sobr", "Sobrancelha", 15.0, 30, "servico-sobrancelha-preto.jpg"),
            service("svc_pig", "Pigmentação", 60.0, 60, "servico-maquina-preto.jpg"),
            service("svc_degrade", "Degradê", 45.0, 45, "servico-corte2-preto.jpg"),
            service("svc_kids", "Infantil", 30.0, 30, "servico-corte-infantil-preto.jpg"),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Professional {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub specialty: String,
    #[serde(default)]
    pub image: String,
}

impl Record for Professional {
    const KEY: &'static str = keys::PROFESSIONALS;

    fn id(&self) -> &str {
        &self.id
    }

    fn seed() -> Vec<Self> {
        vec![Professional {
            id: "1".to_string(),
            name: "Pablo Silva".to_string(),
            specialty: DEFAULT_SPECIALTY.to_string(),
            image: DEFAULT_PROFESSIONAL_IMAGE.to_string(),
        }]
    }
}

/// Opening hours of one weekday, kept as the raw `HH:MM` strings the
/// dashboard edits. Closed days may carry empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    pub enabled: bool,
    #[serde(default)]
    pub open_time: String,
    #[serde(default)]
    pub close_time: String,
    #[serde(default)]
    pub break_start: String,
    #[serde(default)]
    pub break_end: String,
}

impl DaySchedule {
    fn open(open: &str, close: &str) -> Self {
        Self {
            enabled: true,
            open_time: open.to_string(),
            close_time: close.to_string(),
            break_start: "12:00".to_string(),
            break_end: "14:00".to_string(),
        }
    }

    pub fn closed() -> Self {
        Self {
            enabled: false,
            open_time: String::new(),
            close_time: String::new(),
            break_start: String::new(),
            break_end: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub monday: DaySchedule,
    pub tuesday: DaySchedule,
    pub wednesday: DaySchedule,
    pub thursday: DaySchedule,
    pub friday: DaySchedule,
    pub saturday: DaySchedule,
    pub sunday: DaySchedule,
}

impl WorkingHours {
    pub const WEEK: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    pub fn day(&self, weekday: Weekday) -> &DaySchedule {
        match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    pub fn day_mut(&mut self, weekday: Weekday) -> &mut DaySchedule {
        match weekday {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        }
    }
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            monday: DaySchedule::open("08:00", "18:00"),
            tuesday: DaySchedule::open("08:00", "18:00"),
            wednesday: DaySchedule::open("08:00", "18:00"),
            thursday: DaySchedule::open("08:00", "18:00"),
            friday: DaySchedule::open("08:00", "18:00"),
            saturday: DaySchedule::open("08:00", "17:00"),
            sunday: DaySchedule::closed(),
        }
    }
}

impl Document for WorkingHours {
    const KEY: &'static str = keys::HOURS;
}

pub fn weekday_key(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

pub fn weekday_label(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Segunda-feira",
        Weekday::Tue => "Terça-feira",
        Weekday::Wed => "Quarta-feira",
        Weekday::Thu => "Quinta-feira",
        Weekday::Fri => "Sexta-feira",
        Weekday::Sat => "Sábado",
        Weekday::Sun => "Domingo",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarbershopProfile {
    pub name: String,
    pub logo: String,
    pub instagram: String,
    pub whatsapp: String,
    pub description: String,
}

impl Default for BarbershopProfile {
    fn default() -> Self {
        Self {
            name: "Régua Máxima".to_string(),
            logo: "/assets/images/logos/logo.png".to_string(),
            instagram: "@reguamaxima".to_string(),
            whatsapp: "(00) 00000-0000".to_string(),
            description: "Barbearia de excelência com atendimento personalizado".to_string(),
        }
    }
}

impl Document for BarbershopProfile {
    const KEY: &'static str = keys::PROFILE;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetAudience {
    All,
    Barbers,
    Clients,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|priority| priority.as_str() == value)
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::High => "Alta",
            Priority::Medium => "Média",
            Priority::Low => "Baixa",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromotionStatus {
    Active,
    Scheduled,
    Expired,
}

impl PromotionStatus {
    pub const ALL: [PromotionStatus; 3] = [
        PromotionStatus::Active,
        PromotionStatus::Scheduled,
        PromotionStatus::Expired,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PromotionStatus::Active => "active",
            PromotionStatus::Scheduled => "scheduled",
            PromotionStatus::Expired => "expired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }

    pub fn label(self) -> &'static str {
        match self {
            PromotionStatus::Active => "Ativa",
            PromotionStatus::Scheduled => "Agendada",
            PromotionStatus::Expired => "Expirada",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub target_audience: TargetAudience,
    #[serde(default)]
    pub priority: Priority,
    pub status: PromotionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default)]
    pub view_count: u64,
}

impl Record for Promotion {
    const KEY: &'static str = keys::PROMOTIONS;

    fn id(&self) -> &str {
        &self.id
    }

    fn seed() -> Vec<Self> {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default();
        vec![
            Promotion {
                id: "pr1".to_string(),
                title: "Novos Recursos Disponíveis!".to_string(),
                description: "Confira as novas funcionalidades do sistema para melhorar seu atendimento."
                    .to_string(),
                image: Some("/assets/images/stickers/sticker1.jpg".to_string()),
                start_date: date(2024, 12, 1),
                end_date: date(2024, 12, 31),
                target_audience: TargetAudience::Barbers,
                priority: Priority::High,
                status: PromotionStatus::Active,
                link: None,
                view_count: 456,
            },
            Promotion {
                id: "pr2".to_string(),
                title: "Campanha de Natal".to_string(),
                description: "Aumente suas vendas com nossas dicas especiais de fim de ano!".to_string(),
                image: Some("/assets/images/stickers/sticker2.jpg".to_string()),
                start_date: date(2024, 12, 10),
                end_date: date(2024, 12, 25),
                target_audience: TargetAudience::All,
                priority: Priority::High,
                status: PromotionStatus::Active,
                link: None,
                view_count: 234,
            },
            Promotion {
                id: "pr3".to_string(),
                title: "Treinamento Gratuito".to_string(),
                description: "Participe do nosso webinar sobre gestão de barbearia.".to_string(),
                image: Some("/assets/images/stickers/sticker3.jpg".to_string()),
                start_date: date(2024, 11, 20),
                end_date: date(2024, 11, 30),
                target_audience: TargetAudience::Barbers,
                priority: Priority::Medium,
                status: PromotionStatus::Expired,
                link: Some("https://example.com/webinar".to_string()),
                view_count: 189,
            },
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StickerFavorites(pub Vec<String>);

impl Document for StickerFavorites {
    const KEY: &'static str = keys::STICKER_FAVORITES;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn booking_reads_the_stored_json_shape() {
        let raw = json!({
            "id": "agd_20261019_001",
            "clientName": "Maria Souza",
            "clientPhone": "(11) 98888-7777",
            "professionalName": "Pablo Silva",
            "serviceName": "Corte de cabelo",
            "date": "2026-10-19",
            "time": "09:30",
            "price": 35,
            "status": "scheduled",
            "createdAt": "2026-10-16T12:00:00Z"
        });

        let booking: Booking = serde_json::from_value(raw).unwrap();
        assert_eq!(booking.time, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(booking.price, 35.0);
        assert!(booking.professional_id.is_empty());

        let written = serde_json::to_value(&booking).unwrap();
        assert_eq!(written["time"], "09:30");
        assert_eq!(written["date"], "2026-10-19");
        assert_eq!(written["clientPhone"], "(11) 98888-7777");
    }

    #[test]
    fn booking_with_garbage_time_is_rejected() {
        let raw = json!({
            "id": "x", "clientName": "A B", "clientPhone": "1", "professionalName": "P",
            "serviceName": "S", "date": "2026-10-19", "time": "half past nine",
            "price": 1, "status": "scheduled"
        });
        assert!(serde_json::from_value::<Booking>(raw).is_err());
    }

    #[test]
    fn only_scheduled_bookings_transition() {
        use BookingStatus::*;
        assert!(Scheduled.can_transition_to(Cancelled));
        assert!(Scheduled.can_transition_to(Completed));
        assert!(!Cancelled.can_transition_to(Scheduled));
        assert!(!Cancelled.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Scheduled.can_transition_to(Scheduled));
    }

    #[test]
    fn default_hours_close_sunday() {
        let hours = WorkingHours::default();
        assert!(!hours.day(Weekday::Sun).enabled);
        assert_eq!(hours.day(Weekday::Sat).close_time, "17:00");
        assert_eq!(hours.day(Weekday::Mon).break_start, "12:00");

        let written = serde_json::to_value(&hours).unwrap();
        assert_eq!(written["monday"]["openTime"], "08:00");
        assert_eq!(written["sunday"]["enabled"], false);
    }
}

mod card;
mod column;
mod completed;
mod id;
mod reminder;

pub use card::{Card, CreateCard, Priority, UpdateCard};
pub use column::{Column, CreateColumn};
pub use completed::CompletedGroup;
pub use id::EntityId;
pub use reminder::{CreateReminder, Reminder, ReminderPreset};

pub mod entry;
pub mod forms;
pub mod mood;
pub mod pages;
pub mod user;

pub use entry::{sort_newest_first, CheckIn, EntryFilter, MoodEntry, DATE_FORMAT, TIMESTAMP_FORMAT};
pub use forms::{CheckinForm, LoginForm, SettingsForm};
pub use mood::{Mood, MoodLabel, UnknownMood, DEFAULT_EMOJI, LOW_MOODS, NO_DATA_EMOJI};
pub use pages::{
    ChartPoint, CheckinPage, DashboardPage, EntryView, HistoryPage, LoginPage, MoodOption, ResultRow, ResultsPage,
    SettingsPage, StudentRow, StudentsPage,
};
pub use user::{NewUser, Role, User, UserChanges};

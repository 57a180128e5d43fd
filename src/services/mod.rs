pub mod pomodoro;
pub mod rules;

///! Some utility functions

use std::io::{stdin, stdout, Read, Write};

use chrono::NaiveDate;

use crate::Task;

/// Format a single task on one line: completion, importance, text, dates and ID
pub fn format_task(task: &Task) -> String {
    let completion = if task.completed() { "✓" } else { " " };
    let importance = if task.is_important() { "!" } else { " " };
    format!("{}{} {}\tdue {}\tscheduled {}\t({})",
        completion, importance, task.text(),
        format_date(task.due_date()), format_date(task.scheduled_date()),
        task.id())
}

fn format_date(date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => d.format("%Y-%m-%d").to_string(),
        None => "-".to_string(),
    }
}

pub fn print_task(task: &Task) {
    println!("    {}", format_task(task));
}

/// A debug utility that pretty-prints a list of tasks
pub fn print_task_list(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("    (no tasks)");
    }
    for task in tasks {
        print_task(task);
    }
}


/// Wait for the user to press enter
pub fn pause() {
    let mut stdout = stdout();
    stdout.write_all(b"Press Enter to continue...").unwrap();
    stdout.flush().unwrap();
    stdin().read_exact(&mut [0]).unwrap();
}

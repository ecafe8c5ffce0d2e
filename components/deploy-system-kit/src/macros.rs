#[macro_export]
macro_rules! colorize {
    ($colour:expr, $s:expr) => {{
        use $crate::__private::{atty, Colour};
        let s: String = $s;
        if atty::is(atty::Stream::Stdout) {
            let colour: Colour = $colour;
            colour.bold().paint(s).to_string()
        } else {
            s
        }
    }};
}

#[macro_export]
macro_rules! green {
    ($i:ident) => ($crate::colorize!($crate::__private::Colour::Green, $i.to_string()));
    ($($arg:tt)*) => ($crate::colorize!($crate::__private::Colour::Green, format!($($arg)*)));
}

#[macro_export]
macro_rules! red {
    ($i:ident) => ($crate::colorize!($crate::__private::Colour::Red, $i.to_string()));
    ($($arg:tt)*) => ($crate::colorize!($crate::__private::Colour::Red, format!($($arg)*)));
}

#[macro_export]
macro_rules! yellow {
    ($i:ident) => ($crate::colorize!($crate::__private::Colour::Yellow, $i.to_string()));
    ($($arg:tt)*) => ($crate::colorize!($crate::__private::Colour::Yellow, format!($($arg)*)));
}

#[macro_export]
macro_rules! blue {
    ($i:ident) => ($crate::colorize!($crate::__private::Colour::Cyan, $i.to_string()));
    ($($arg:tt)*) => ($crate::colorize!($crate::__private::Colour::Cyan, format!($($arg)*)));
}

#[macro_export]
macro_rules! pluralize {
    ($value:expr, $word:expr) => {
        if $value > 1 {
            format!("{} {}s", $value, $word)
        } else {
            format!("{} {}", $value, $word)
        }
    };
}

#[macro_export]
macro_rules! format_err {
    ($i:ident) => (format!("{} {}", $crate::red!("error:"), $i));
    ($($arg:tt)*) => (format!("{} {}", $crate::red!("error:"), format!($($arg)*)));
}

#[macro_export]
macro_rules! format_warn {
    ($i:ident) => (format!("{} {}", $crate::yellow!("warn:"), $i));
    ($($arg:tt)*) => (format!("{} {}", $crate::yellow!("warn:"), format!($($arg)*)));
}

#[macro_export]
macro_rules! format_note {
    ($i:ident) => (format!("{} {}", $crate::blue!("note:"), $i));
    ($($arg:tt)*) => (format!("{} {}", $crate::blue!("note:"), format!($($arg)*)));
}

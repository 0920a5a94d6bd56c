use extend::ext;
use itertools::Itertools;

/// Run a fallible block and log its error, if any.
/// The block is an async block when written as `async => { ... }`.
#[macro_export]
macro_rules! try_logging_errors {
    ($context:expr => async $code:block) => {{
        let result: ::anyhow::Result<()> = async {
            $code;
            Ok::<(), ::anyhow::Error>(())
        }
        .await;
        if let Err(err) = result {
            log::error!("[{}:{}] Error while {}: {:?}", ::std::file!(), ::std::line!(), $context, err);
        }
    }};
    ($context:expr => $code:block) => {{
        let result: ::anyhow::Result<()> = (|| {
            $code;
            Ok::<(), ::anyhow::Error>(())
        })();
        if let Err(err) = result {
            log::error!("[{}:{}] Error while {}: {:?}", ::std::file!(), ::std::line!(), $context, err);
        }
    }};
}

#[macro_export]
macro_rules! print_result_err {
    ($context:expr, $result:expr $(,)?) => {{
        if let Err(err) = $result {
            log::error!("[{}:{}] Error {}: {:?}", ::std::file!(), ::std::line!(), $context, err);
        }
    }};
}

#[macro_export]
macro_rules! regex {
    ($re:literal $(,)?) => {{
        static RE: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
        RE.get_or_init(|| regex::Regex::new($re).unwrap())
    }};
}

#[ext(pub, name = StringExt)]
impl<T: AsRef<str>> T {
    /// check if the string is empty after removing all linebreaks and trimming
    /// whitespace
    fn is_blank(self) -> bool {
        self.as_ref().replace('\n', "").trim().is_empty()
    }

    /// trim all lines in a string
    fn trim_lines(self) -> String {
        self.as_ref().lines().map(|line| line.trim()).join("\n")
    }

    /// Shorten to at most `max` characters, marking the cut with an ellipsis.
    fn ellipsize(self, max: usize) -> String {
        let s = self.as_ref();
        if s.chars().count() <= max {
            s.to_string()
        } else {
            format!("{}…", s.chars().take(max.saturating_sub(1)).collect::<String>())
        }
    }
}

/// Replace all env-var references of the format `"something ${foo}"` in a string
/// by the actual env-variables. If the env-var isn't found, will replace the
/// reference with an empty string.
pub fn replace_env_var_references(input: String) -> String {
    regex!(r"\$\{([^\s]*)\}")
        .replace_all(&input, |caps: &regex::Captures| std::env::var(&caps[1]).unwrap_or_default())
        .into_owned()
}

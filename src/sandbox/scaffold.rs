//! Trusted scaffolding wrapped around every attempt
//!
//! Layout of an assembled program:
//!
//! 1. `scaffold-pre`: capture the real stdout, install the token helper,
//!    silence prerun output
//! 2. `exercise-prerun`
//! 3. `scaffold-mid`: start capturing attempt output and the attempt clock
//! 4. `attempt`
//! 5. `scaffold-mid-2`: stop the clock, start capturing postrun output
//! 6. `exercise-postrun`
//! 7. `scaffold-post`: restore stdout and print the framed envelope
//!
//! Builtins used after the attempt runs are bound to reserved names
//! beforehand.
//!
//! Every `__rozelle_` name below is mangled before execution. Exercise code
//! is mangled with the same salt, so prerun/postrun code can call
//! `__rozelle_token(name)` to add to the envelope's tokens.

use super::envelope::{ENVELOPE_BEGIN, ENVELOPE_END};
use crate::assemble::Fragment;

/// Salt for every trusted fragment of an assembled program.
pub const TRUSTED_SALT: u64 = 0x726f_7a65_6c6c_65;

pub const LABEL_PRE: &str = "scaffold-pre";
pub const LABEL_PRERUN: &str = "exercise-prerun";
pub const LABEL_MID: &str = "scaffold-mid";
pub const LABEL_ATTEMPT: &str = "attempt";
pub const LABEL_MID_2: &str = "scaffold-mid-2";
pub const LABEL_POSTRUN: &str = "exercise-postrun";
pub const LABEL_POST: &str = "scaffold-post";

const PRE: &str = r#"
__rozelle_sys = __import__("sys")
__rozelle_io = __import__("io")
__rozelle_json = __import__("json")
__rozelle_time = __import__("time")
__rozelle_sorted = sorted
__rozelle_str = str
__rozelle_stdout = __rozelle_sys.stdout
__rozelle_tokens = set()


def __rozelle_token(name):
    __rozelle_tokens.add(__rozelle_str(name))


__rozelle_sys.stdout = __rozelle_io.StringIO()
"#;

const MID: &str = r#"
__rozelle_attempt_stdout = __rozelle_io.StringIO()
__rozelle_sys.stdout = __rozelle_attempt_stdout
__rozelle_attempt_started = __rozelle_time.perf_counter()
"#;

const MID_2: &str = r#"
__rozelle_attempt_seconds = __rozelle_time.perf_counter() - __rozelle_attempt_started
__rozelle_postrun_stdout = __rozelle_io.StringIO()
__rozelle_sys.stdout = __rozelle_postrun_stdout
"#;

const POST_TEMPLATE: &str = r#"
__rozelle_sys.stdout = __rozelle_stdout
__rozelle_stdout.write("@BEGIN@\n")
__rozelle_stdout.write(
    __rozelle_json.dumps(
        {
            "stdout": __rozelle_attempt_stdout.getvalue().splitlines(),
            "postrun_stdout": __rozelle_postrun_stdout.getvalue().splitlines(),
            "tokens": __rozelle_sorted(__rozelle_tokens),
            "attempt_time_seconds": __rozelle_attempt_seconds,
        }
    )
)
__rozelle_stdout.write("\n@END@\n")
__rozelle_stdout.flush()
"#;

fn post() -> String {
    POST_TEMPLATE
        .replace("@BEGIN@", ENVELOPE_BEGIN)
        .replace("@END@", ENVELOPE_END)
}

/// The full, ordered fragment list for one evaluation.
pub fn program_fragments(prerun: &str, attempt: &str, postrun: &str) -> Vec<Fragment> {
    vec![
        Fragment::trusted(LABEL_PRE, PRE, TRUSTED_SALT),
        Fragment::trusted(LABEL_PRERUN, prerun, TRUSTED_SALT),
        Fragment::trusted(LABEL_MID, MID, TRUSTED_SALT),
        Fragment::untrusted(LABEL_ATTEMPT, attempt),
        Fragment::trusted(LABEL_MID_2, MID_2, TRUSTED_SALT),
        Fragment::trusted(LABEL_POSTRUN, postrun, TRUSTED_SALT),
        Fragment::trusted(LABEL_POST, post(), TRUSTED_SALT),
    ]
}

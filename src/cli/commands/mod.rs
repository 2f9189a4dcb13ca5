mod gdpr;
mod login_attempts;
mod password_reset;
mod user;

pub use gdpr::{cmd_gdpr_delete, cmd_gdpr_download};
pub use login_attempts::cmd_login_attempts;
pub use password_reset::cmd_password_reset;
pub use user::{cmd_user_create, cmd_user_update};

use crate::forms::Form;

fn print_form_errors(form: &Form) {
    println!("The form could not be saved:");
    for (field, message) in form.error_list() {
        if field.is_empty() {
            println!("  • {message}");
        } else {
            println!("  • {field}: {message}");
        }
    }
}

use input_synthesis::context::context_model::ExtractionRules;
use input_synthesis::context::extractor::AppIdentity;

pub const PKG: &str = "com.example.shop";

/// Wrap nodes in a `<hierarchy>` root the way uiautomator dumps do.
pub fn hierarchy(body: &str) -> String {
    format!(
        "<?xml version='1.0' encoding='UTF-8' standalone='yes' ?><hierarchy rotation=\"0\">{}</hierarchy>",
        body
    )
}

/// A container node owned by `package`.
pub fn frame(package: &str, children: &str) -> String {
    format!(
        "<node index=\"0\" text=\"\" resource-id=\"\" class=\"android.widget.FrameLayout\" package=\"{}\" bounds=\"[0,0][1080,2400]\">{}</node>",
        package, children
    )
}

pub fn edit_text(index: u32, resource_id: &str, bounds: &str, text: &str, hint: &str) -> String {
    format!(
        "<node index=\"{}\" text=\"{}\" hint=\"{}\" resource-id=\"{}\" class=\"android.widget.EditText\" package=\"{}\" clickable=\"true\" bounds=\"{}\" />",
        index, text, hint, resource_id, PKG, bounds
    )
}

pub fn text_view(text: &str, bounds: &str) -> String {
    text_view_in(PKG, text, bounds)
}

pub fn text_view_in(package: &str, text: &str, bounds: &str) -> String {
    format!(
        "<node index=\"0\" text=\"{}\" resource-id=\"\" class=\"android.widget.TextView\" package=\"{}\" bounds=\"{}\" />",
        text, package, bounds
    )
}

pub fn button(text: &str, resource_id: &str, bounds: &str) -> String {
    format!(
        "<node index=\"0\" text=\"{}\" resource-id=\"{}\" class=\"android.widget.Button\" package=\"{}\" clickable=\"true\" bounds=\"{}\" />",
        text, resource_id, PKG, bounds
    )
}

/// A sign-in form: two fields, each with a label above it, plus a system bar.
pub fn login_screen() -> String {
    hierarchy(&format!(
        "{}{}",
        frame(
            PKG,
            &format!(
                "{}{}{}{}{}",
                text_view("Email", "[100,200][400,260]"),
                edit_text(1, "com.example.shop:id/email", "[100,300][980,400]", "", "you@example.com"),
                text_view("Password", "[100,500][400,560]"),
                edit_text(3, "com.example.shop:id/password", "[100,600][980,700]", "", "Password"),
                button("Sign in", "com.example.shop:id/submit", "[100,900][980,1000]"),
            ),
        ),
        frame("com.android.systemui", &text_view_in("com.android.systemui", "12:00", "[0,0][200,60]")),
    ))
}

pub fn login_app() -> AppIdentity {
    AppIdentity {
        app_name: "Shop".to_string(),
        package_name: PKG.to_string(),
        activity: "com.example.shop.ui.LoginActivity".to_string(),
    }
}

pub fn rules() -> ExtractionRules {
    ExtractionRules::default()
}

/// Model reply with a fenced JSON block.
pub fn fenced(json: &str) -> String {
    format!("Here are the values.\n```json\n{}\n```\nGood luck!", json)
}

//! Diff rendering for scenario comparison.

/// Render a text diff between expected and actual output.
#[must_use]
pub fn render_diff(expected: &str, actual: &str) -> String {
    if expected == actual {
        return String::from("[identical]");
    }

    let exp: Vec<&str> = expected.lines().collect();
    let act: Vec<&str> = actual.lines().collect();
    let common = exp.len().min(act.len());

    let mut out = String::new();
    out.push_str("--- expected\n");
    out.push_str("+++ actual\n");
    for i in 0..common {
        if exp[i] != act[i] {
            out.push_str(&format!("@@ line {} @@\n", i + 1));
            out.push_str(&format!("-{}\n", exp[i]));
            out.push_str(&format!("+{}\n", act[i]));
        }
    }
    // Unpaired tails appear when the outputs have different line counts
    for (i, e) in exp.iter().enumerate().skip(common) {
        out.push_str(&format!("@@ line {} @@\n", i + 1));
        out.push_str(&format!("-{e}\n"));
    }
    for (i, a) in act.iter().enumerate().skip(common) {
        out.push_str(&format!("@@ line {} @@\n", i + 1));
        out.push_str(&format!("+{a}\n"));
    }
    out
}

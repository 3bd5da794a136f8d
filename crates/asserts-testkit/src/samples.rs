//! Sample documents in their encoded text form.
//!
//! These carry a placeholder signature. They decode, but never verify.

/// A well-formed SHA3-384 key id that matches no real key.
pub const SIGN_KEY_ID: &str = "TXhg7F8SSHpoA0d0vMCh60VJcW20ftEY-uSkDXX9ESjaD5I0qtW2Yhdd054rSRnV";

/// Placeholder signature.
pub const SIGNATURE: &str = "AXNpZw==";

/// Header block of a model signed by its brand.
pub const MODEL_HEAD: &str = "type: model\n\
                              authority-id: brand-id1\n\
                              series: 16\n\
                              brand-id: brand-id1\n\
                              model: baz-3000\n\
                              core: core\n\
                              architecture: amd64\n\
                              gadget: brand-gadget\n\
                              kernel: baz-linux\n\
                              store: brand-store\n\
                              class: fixed\n\
                              timestamp: 2017-03-30T12:22:16Z";

/// Header block of a repair with lists and a multi-line summary.
pub const REPAIR_HEAD: &str = "type: repair\n\
                               authority-id: acme\n\
                               brand-id: acme\n\
                               repair-id: 42\n\
                               architectures:\n  - amd64\n  - arm64\n\
                               models:\n  - acme/frobinator\n\
                               summary:\n    fix the frobinator\n    on all boards\n\
                               timestamp: 2017-03-30T12:22:16Z";

/// Encode `head` and `body` with [`SIGN_KEY_ID`] and [`SIGNATURE`].
pub fn document(head: &str, body: &str) -> String {
    let mut text = format!("{head}\nsign-key-sha3-384: {SIGN_KEY_ID}");
    if !body.is_empty() {
        text.push_str(&format!("\nbody-length: {}\n\n{body}", body.len()));
    }
    text.push_str("\n\n");
    text.push_str(SIGNATURE);
    text
}

/// `head` with the value of header `name` replaced.
pub fn replace_header(head: &str, name: &str, value: &str) -> String {
    let prefix = format!("{name}:");
    head.lines()
        .map(|line| match line.starts_with(&prefix) {
            true => format!("{name}: {value}"),
            false => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `head` without the line of header `name`.
pub fn remove_header(head: &str, name: &str) -> String {
    let prefix = format!("{name}:");
    head.lines()
        .filter(|line| !line.starts_with(&prefix))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use asserts_core::decode;

    #[test]
    fn test_samples_decode() {
        let model = decode(document(MODEL_HEAD, "").as_bytes()).unwrap();
        assert_eq!(model.sign_key_id(), SIGN_KEY_ID);

        let repair = decode(document(REPAIR_HEAD, "#!/bin/sh\n").as_bytes()).unwrap();
        let repair = repair.as_repair().unwrap();
        assert_eq!(repair.summary(), "fix the frobinator\non all boards");
        assert_eq!(repair.architectures(), ["amd64", "arm64"]);
        assert_eq!(repair.script(), b"#!/bin/sh\n");
    }

    #[test]
    fn test_header_edits() {
        let head = replace_header(MODEL_HEAD, "class", "dynamic");
        assert!(head.contains("\nclass: dynamic\n"));
        assert!(!remove_header(MODEL_HEAD, "class").contains("class:"));
    }
}

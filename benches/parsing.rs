use criterion::{criterion_group, criterion_main, Criterion};
use std::path::Path;

fn fixture_text(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    emlview::parser::eml::read_eml(&path).unwrap()
}

fn bench_parse_nested(c: &mut Criterion) {
    let text = fixture_text("nested.eml");
    let parser = emlview::parser::EmlParser::new();

    c.bench_function("parse_nested_eml", |b| b.iter(|| parser.parse(&text).unwrap()));
}

fn bench_parse_large_attachment(c: &mut Criterion) {
    // One text part plus a 1 MiB base64 attachment wrapped at 76 columns.
    let payload = emlview::parser::decode::encode_base64(&vec![0x5Au8; 1 << 20]);
    let wrapped: Vec<&str> = payload
        .as_bytes()
        .chunks(76)
        .map(|line| std::str::from_utf8(line).unwrap())
        .collect();
    let text = format!(
        "From: bench@example.com\r\nSubject: Large\r\n\
         Content-Type: multipart/mixed; boundary=\"BIG\"\r\n\r\n\
         --BIG\r\nContent-Type: text/plain\r\n\r\nsee attached\r\n\
         --BIG\r\nContent-Type: application/octet-stream\r\n\
         Content-Disposition: attachment; filename=\"blob.bin\"\r\n\
         Content-Transfer-Encoding: base64\r\n\r\n{}\r\n--BIG--\r\n",
        wrapped.join("\r\n")
    );
    let parser = emlview::parser::EmlParser::new();

    c.bench_function("parse_1mib_attachment", |b| {
        b.iter(|| parser.parse(&text).unwrap())
    });
}

fn bench_quoted_printable(c: &mut Criterion) {
    let line = "Caf=E9 au lait =C2=A9 2024, soft=\r\nbreak and plain ASCII text here.\r\n";
    let text = line.repeat(2000);

    c.bench_function("decode_quoted_printable", |b| {
        b.iter(|| emlview::parser::decode::decode_quoted_printable(&text))
    });
}

criterion_group!(
    benches,
    bench_parse_nested,
    bench_parse_large_attachment,
    bench_quoted_printable
);
criterion_main!(benches);

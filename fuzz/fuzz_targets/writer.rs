#![no_main]

use libfuzzer_sys::fuzz_target;

use csv_scribe::WriterBuilder;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let mut writer = WriterBuilder::new()
        .buffer_capacity(64)
        .from_writer(Cursor::new(Vec::<u8>::new()))
        .unwrap();

    writer.write_record([data, &b"tail"[..]]).unwrap();
    let out = writer.into_inner().unwrap().into_inner();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(out.as_slice());

    let mut records = reader.byte_records();
    let record = records.next().unwrap().unwrap();

    assert_eq!(&record[0], data);
    assert_eq!(&record[1], b"tail");
});

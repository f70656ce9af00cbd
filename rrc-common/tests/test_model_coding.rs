// Context models driven through the arithmetic coder

use rrc_common::{
    ArithmeticDecoder, ArithmeticEncoder, CodecLimits, ContainerHeader, ContextModel, ModelBank,
    TableInit,
};

#[test]
fn test_context_model_round_trip() {
    let mut encoder_model = ContextModel::new("test", 4, 16, TableInit::Uniform);
    let mut sink = ArithmeticEncoder::new(Vec::new());

    // skewed per-context distributions so adaptation matters
    let symbols: Vec<(u32, u32)> = (0..5000u32)
        .map(|i| (i % 4, if i % 7 == 0 { i % 16 } else { i % 4 }))
        .collect();
    for &(ctx, sym) in &symbols {
        encoder_model.encode(ctx, sym, &mut sink).unwrap();
    }
    let (payload, written) = sink.finish().unwrap();
    assert_eq!(written, payload.len() as u64);
    // far below one byte per symbol once the contexts have adapted
    assert!(payload.len() < symbols.len() / 2, "{} bytes", payload.len());

    let mut decoder_model = ContextModel::new("test", 4, 16, TableInit::Uniform);
    let mut source = ArithmeticDecoder::new(&payload[..]).unwrap();
    for &(ctx, sym) in &symbols {
        assert_eq!(decoder_model.decode(ctx, &mut source).unwrap(), sym);
    }
    assert_eq!(decoder_model.active_contexts(), 4);
}

#[test]
fn test_escape_only_model_refuses_unregistered_index() {
    let limits = CodecLimits::default();
    let mut bank = ModelBank::new(limits).unwrap();
    let mut sink = ArithmeticEncoder::new(Vec::new());

    let err = bank.position.encode(0, 1, &mut sink).unwrap_err();
    assert!(err.is_corruption());

    let index = bank.position_alphabet.register(77).unwrap();
    bank.position.observe(0, index).unwrap();
    bank.position.encode(0, index, &mut sink).unwrap();
}

#[test]
fn test_header_carries_model_shape() {
    let limits = CodecLimits {
        max_read_length: 300,
        max_alphabet_cardinality: 1 << 12,
        snp_position_buckets: 4,
    };
    let mut header = ContainerHeader::new(limits, false);
    header.block_read_counts = vec![10, 20];
    let mut bytes = Vec::new();
    header.write(&mut bytes).unwrap();

    let parsed = ContainerHeader::read(&mut &bytes[..]).unwrap();
    let bank = ModelBank::new(parsed.limits).unwrap();
    assert_eq!(bank.variant.alphabet_size(), 1 << 10);
    assert_eq!(bank.variant.num_contexts(), 4 << 11);
    assert_eq!(bank.snp_count.alphabet_size(), 301);
    assert_eq!(bank.position.alphabet_size(), 1 << 12);
}

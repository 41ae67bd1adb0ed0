//! End-to-end evaluation of small hand-written commit traces.

use pretty_assertions::assert_eq;
use pythia::*;

fn reader(trace: &str) -> TraceReader<&[u8]> {
    TraceReader::new("test", trace.as_bytes())
}

fn rocket() -> Evaluator<Predictor> {
    let p = PredictorConfig::default().build().unwrap();
    Evaluator::new(p).with_event_log()
}

#[test]
fn no_control_flow() {
    let trace = "\
0x0000000000001000 (0x00000013) x 0 0x0000000000000000
0x0000000000001004 (0x00a00593) x11 0x000000000000000a
";
    let mut eval = rocket();
    let res = eval.run(reader(trace));
    assert!(matches!(res, Err(EvalError::NoControlFlow)));
    assert_eq!(eval.num_records(), 2);
}

#[test]
fn cold_not_taken_branch() {
    let trace = "\
0x0000000000002000 (0x00050863)
0x0000000000002004 (0x00000013) x 0 0x0000000000000000
";
    let mut eval = rocket();
    let stats = eval.run(reader(trace)).unwrap();
    assert_eq!(stats, EvalStats { br: 1, ..EvalStats::default() });
    assert_eq!(eval.events()[0].prediction, Prediction::not_taken(0x2004));

    let res = eval.predictor().btb().predict(0x2000);
    assert!(res.hit);
    assert_eq!(res.payload, BtbPayload::new(0x2004, false));
}

#[test]
fn return_predicted_from_ras() {
    // call 0x3040; ret; j 0x3000 (twice)
    let trace = "\
0x0000000000003000 (0x040000ef) x 1 0x0000000000003004
0x0000000000003040 (0x00008067)
0x0000000000003004 (0xffdff06f)
0x0000000000003000 (0x040000ef) x 1 0x0000000000003004
0x0000000000003040 (0x00008067)
0x0000000000003004 (0xffdff06f)
";
    let mut eval = rocket();
    let stats = eval.run(reader(trace)).unwrap();

    let ret = eval.events()[4];
    assert!(ret.facts.is_return);
    assert_eq!(ret.prediction, Prediction::taken(0x3004, 0));
    assert_eq!(ret.resolution, Some(Resolution {
        taken: true, target: 0x3004, mispredicted: false,
    }));

    assert_eq!(stats, EvalStats {
        jal: 3, jalr: 2,
        ret: 2, call: 2,
        taken: 5,
        mispredict: 4,
        misp_jal: 3,
        misp_jalr: 1,
        missed_ret: 1,
        ..EvalStats::default()
    });

    // The second call pushed its return address, only one was popped
    let ras = eval.predictor().ras();
    assert_eq!(ras.len(), 1);
    assert_eq!(ras.top(), Some(0x3004));
    assert_eq!(ras.overflows(), 0);
}

#[test]
fn malformed_line_terminates() {
    let trace = "\
0x0000000000002000 (0x00050863)
0x00000000000020zz (0x00000013)
0x0000000000002008 (0x00000013)
";
    let mut eval = rocket();
    let res = eval.run(reader(trace));
    match res {
        Err(EvalError::Trace(TraceError::Parse { line_no, line, .. })) => {
            assert_eq!(line_no, 2);
            assert_eq!(line, "0x00000000000020zz (0x00000013)");
        },
        other => panic!("unexpected result {:?}", other),
    }
    // The branch on line 1 never saw its successor
    assert_eq!(eval.stats().total(), 0);
}

#[test]
fn blank_lines_are_skipped() {
    let trace = "\
0x0000000000002000 (0x00050863)

0x0000000000002010 (0x00000013)

";
    let stats = evaluate(PredictorConfig::default().build().unwrap(),
        reader(trace)).unwrap();
    assert_eq!(stats.br, 1);
    assert_eq!(stats.taken, 1);
}

#[test]
fn superscalar_from_json() {
    let cfg = PredictorConfig::from_json(
        r#"{ "kind": "superscalar", "fetch_width": 4, "btb_entries": 16 }"#
    ).unwrap();
    let p = cfg.build().unwrap();
    assert_eq!(p.name(), "SS-Version 1 (full commit info)");

    // A loop of two instructions inside one fetch bundle
    let mut trace = String::new();
    for _ in 0..40 {
        trace.push_str("0x0000000000004000 (0x00000013)\n");
        trace.push_str("0x0000000000004004 (0xffdff06f)\n");
    }
    trace.push_str("0x0000000000004000 (0x00000013)\n");

    let mut eval = Evaluator::new(p);
    let stats = eval.run(reader(&trace)).unwrap();
    assert_eq!(stats.jal, 40);
    assert_eq!(stats.taken, 40);
    assert!(stats.mispredict < stats.jal);

    let btb = eval.predictor().btb().predict(0x4000);
    assert!(btb.hit);
    assert_eq!(btb.payload, BtbPayload::new(0x4000, false).with_offset(1));
}

#[test]
fn gshare_history_is_recorded() {
    let cfg = PredictorConfig { history_bits: 8, ..PredictorConfig::default() };
    let trace = "\
0x0000000000002000 (0x00050863)
0x0000000000002010 (0x00050863)
0x0000000000002014 (0x00000013)
";
    let mut eval = Evaluator::new(cfg.build().unwrap());
    eval.run(reader(trace)).unwrap();
    let ghr = eval.predictor().bht().history().unwrap();
    assert_eq!(ghr.len(), 8);
    assert_eq!(ghr.data()[0..2].iter().by_vals().collect::<Vec<bool>>(),
        vec![false, true]);
}
